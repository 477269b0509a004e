use async_trait::async_trait;
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::{Asset, Operation, SetOptions, SignerChange};

use crate::error::{FlowError, Result};
use crate::orchestrator::{Flow, FlowRun, Step};

/// Turns an account into a multisig account.
///
/// The new signers are added in the same transaction as the threshold
/// change and ahead of the master weight change, so there is no
/// intermediate state in which the account is locked out. Configurations
/// whose combined weight cannot reach the high threshold are refused before
/// anything is submitted.
#[derive(Debug, Clone)]
pub struct MultisigThresholdFlow {
    pub account: SecretKey,
    pub signers: Vec<SignerChange>,
    pub master_weight: u8,
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl MultisigThresholdFlow {
    /// Master weight 1, two signers of weight 2, every threshold 5.
    pub fn new(account: SecretKey, signer_a: PublicKey, signer_b: PublicKey) -> Self {
        Self {
            account,
            signers: vec![
                SignerChange { key: signer_a, weight: 2 },
                SignerChange { key: signer_b, weight: 2 },
            ],
            master_weight: 1,
            low: 5,
            medium: 5,
            high: 5,
        }
    }

    /// Weight available when every key signs.
    pub fn total_weight(&self) -> u32 {
        self.master_weight as u32 + self.signers.iter().map(|s| s.weight as u32).sum::<u32>()
    }

    fn check_lockout(&self) -> Result<()> {
        let highest = self.low.max(self.medium).max(self.high) as u32;
        if self.total_weight() < highest {
            return Err(FlowError::validation(format!(
                "total signer weight {} is below threshold {}; the account would be locked out",
                self.total_weight(),
                highest
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Flow for MultisigThresholdFlow {
    type Output = ();

    fn name(&self) -> &str {
        "multisig-threshold"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        self.check_lockout()?;

        let mut operations: Vec<Operation> = self
            .signers
            .iter()
            .map(|s| Operation::add_signer(s.key, s.weight))
            .collect();
        operations.push(Operation::set_options(SetOptions {
            master_weight: Some(self.master_weight),
            low_threshold: Some(self.low),
            med_threshold: Some(self.medium),
            high_threshold: Some(self.high),
            ..Default::default()
        }));

        run.submit(Step::new("configure-signers", &self.account, operations))
            .await?;
        Ok(())
    }
}

/// A payment from a multisig account, signed by the account's master key
/// and every cosigner given.
#[derive(Debug, Clone)]
pub struct MultisigPaymentFlow {
    pub account: SecretKey,
    pub cosigners: Vec<SecretKey>,
    pub destination: PublicKey,
    pub asset: Asset,
    pub amount: i64,
}

#[async_trait]
impl Flow for MultisigPaymentFlow {
    type Output = ();

    fn name(&self) -> &str {
        "multisig-payment"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        let step = self.cosigners.iter().fold(
            Step::new(
                "pay",
                &self.account,
                vec![Operation::payment(self.destination, self.asset.clone(), self.amount)],
            ),
            |step, key| step.cosigned_by(key),
        );
        run.submit(step).await?;
        Ok(())
    }
}
