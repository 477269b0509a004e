use async_trait::async_trait;
use questline_common::{Hash256, STROOPS_PER_UNIT};
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::{Asset, Operation};

use crate::error::Result;
use crate::orchestrator::{Flow, FlowRun, Step};

/// A native payment whose fee is paid by a third account.
///
/// The sender signs the inner payment; the fee source signs only the outer
/// envelope, which is what gets submitted. Returns the inner transaction
/// hash, which stays the same however the envelope is re-priced.
#[derive(Debug, Clone)]
pub struct FeeBumpFlow {
    pub sender: SecretKey,
    pub fee_source: SecretKey,
    pub destination: PublicKey,
    pub amount: i64,
}

impl FeeBumpFlow {
    /// Pays 100 XLM.
    pub fn new(sender: SecretKey, fee_source: SecretKey, destination: PublicKey) -> Self {
        Self {
            sender,
            fee_source,
            destination,
            amount: 100 * STROOPS_PER_UNIT,
        }
    }
}

#[async_trait]
impl Flow for FeeBumpFlow {
    type Output = Hash256;

    fn name(&self) -> &str {
        "fee-bump"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<Hash256> {
        let step = Step::new(
            "sponsored-payment",
            &self.sender,
            vec![Operation::payment(self.destination, Asset::Native, self.amount)],
        );
        let record = run.submit_fee_bump(step, &self.fee_source).await?;
        Ok(record.inner_hash.unwrap_or(record.hash))
    }
}
