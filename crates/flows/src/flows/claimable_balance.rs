use async_trait::async_trait;
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::{Asset, ClaimPredicate, ClaimableBalanceId, Claimant, Operation};

use crate::error::{FlowError, Result};
use crate::orchestrator::{Flow, FlowRun, Step};

/// Seconds the claimant must wait before claiming.
pub const DEFAULT_CLAIM_DELAY_SECS: i64 = 300;

/// Escrows `amount` of `asset` for a claimant.
///
/// The claimant may claim only once [`claim_delay_secs`] of ledger time have
/// passed since creation; the creator may reclaim at any time. The flow
/// returns the balance id, derived from the creating transaction.
///
/// [`claim_delay_secs`]: ClaimableBalanceFlow::claim_delay_secs
#[derive(Debug, Clone)]
pub struct ClaimableBalanceFlow {
    pub creator: SecretKey,
    pub claimant: PublicKey,
    pub asset: Asset,
    pub amount: i64,
    pub claim_delay_secs: i64,
}

impl ClaimableBalanceFlow {
    pub fn new(creator: SecretKey, claimant: PublicKey, asset: Asset, amount: i64) -> Self {
        Self {
            creator,
            claimant,
            asset,
            amount,
            claim_delay_secs: DEFAULT_CLAIM_DELAY_SECS,
        }
    }
}

#[async_trait]
impl Flow for ClaimableBalanceFlow {
    type Output = ClaimableBalanceId;

    fn name(&self) -> &str {
        "claimable-balance"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<ClaimableBalanceId> {
        let claimants = vec![
            Claimant::new(
                self.claimant,
                ClaimPredicate::not_before_relative(self.claim_delay_secs),
            ),
            Claimant::unconditional(self.creator.public_key()),
        ];
        let record = run
            .submit(Step::new(
                "create",
                &self.creator,
                vec![Operation::create_claimable_balance(
                    self.asset.clone(),
                    self.amount,
                    claimants,
                )],
            ))
            .await?;
        record
            .claimable_balance_id()
            .ok_or_else(|| FlowError::validation("create step derived no balance id"))
    }
}

/// Claims a claimable balance. Fails, rather than waiting, if the
/// claimant's predicate does not hold yet.
#[derive(Debug, Clone)]
pub struct ClaimFlow {
    pub claimant: SecretKey,
    pub balance_id: ClaimableBalanceId,
}

#[async_trait]
impl Flow for ClaimFlow {
    type Output = ();

    fn name(&self) -> &str {
        "claim"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        run.submit(Step::new(
            "claim",
            &self.claimant,
            vec![Operation::claim_claimable_balance(self.balance_id)],
        ))
        .await?;
        Ok(())
    }
}
