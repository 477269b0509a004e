use async_trait::async_trait;
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::Operation;

use crate::error::Result;
use crate::orchestrator::{Flow, FlowRun, Step};

/// Creates an account whose base reserve is carried by a sponsor.
///
/// Begin, create and end share one transaction so the sponsorship can
/// never be left open. The end operation acts as the new account, so the
/// new account's key co-signs.
#[derive(Debug, Clone)]
pub struct SponsoredAccountCreation {
    pub sponsor: SecretKey,
    pub new_account: SecretKey,
}

#[async_trait]
impl Flow for SponsoredAccountCreation {
    type Output = PublicKey;

    fn name(&self) -> &str {
        "sponsored-account"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<PublicKey> {
        let sponsored = self.new_account.public_key();
        let step = Step::new(
            "sponsor-and-create",
            &self.sponsor,
            vec![
                Operation::begin_sponsoring_future_reserves(sponsored),
                Operation::create_account(sponsored, 0),
                Operation::end_sponsoring_future_reserves().with_source(sponsored),
            ],
        )
        .cosigned_by(&self.new_account);
        run.submit(step).await?;
        Ok(sponsored)
    }
}
