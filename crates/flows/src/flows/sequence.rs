use async_trait::async_trait;
use questline_crypto::SecretKey;
use questline_tx::Operation;

use crate::error::{FlowError, Result};
use crate::orchestrator::{Flow, FlowRun, Step};

/// How far [`SequenceBumpFlow`] moves the sequence number by default.
pub const DEFAULT_BUMP: i64 = 100;

/// Jumps an account's sequence number forward, then submits a follow-up
/// transaction from the bumped baseline.
///
/// The follow-up is built from a snapshot loaded after the bump landed.
/// A transaction built from the pre-bump snapshot would carry a sequence
/// number the ledger has already skipped past. Returns the sequence number
/// the follow-up consumed.
#[derive(Debug, Clone)]
pub struct SequenceBumpFlow {
    pub account: SecretKey,
    pub bump_by: i64,
}

impl SequenceBumpFlow {
    pub fn new(account: SecretKey) -> Self {
        Self {
            account,
            bump_by: DEFAULT_BUMP,
        }
    }
}

#[async_trait]
impl Flow for SequenceBumpFlow {
    type Output = i64;

    fn name(&self) -> &str {
        "sequence-bump"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<i64> {
        if self.bump_by <= 1 {
            return Err(FlowError::validation(format!(
                "bump must exceed the increment the bump transaction itself consumes, got {}",
                self.bump_by
            )));
        }
        let before = run.load_account(&self.account.public_key()).await?;
        let target = before
            .sequence()
            .checked_add(self.bump_by)
            .ok_or_else(|| FlowError::validation("bumped sequence number overflows"))?;

        run.submit(Step::new(
            "bump",
            &self.account,
            vec![Operation::bump_sequence(target)],
        ))
        .await?;

        let record = run
            .submit(Step::new(
                "follow-up",
                &self.account,
                vec![Operation::manage_data("sequence", Some(b"bumped".to_vec()))],
            ))
            .await?;
        Ok(record.sequence)
    }
}
