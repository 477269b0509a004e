use async_trait::async_trait;
use questline_common::STROOPS_PER_UNIT;
use questline_crypto::SecretKey;
use questline_tx::operations::{
    AUTH_CLAWBACK_ENABLED_FLAG, AUTH_REQUIRED_FLAG, AUTH_REVOCABLE_FLAG, TRUSTLINE_AUTHORIZED_FLAG,
};
use questline_tx::{Asset, Operation, SetOptions};

use crate::error::Result;
use crate::orchestrator::{Flow, FlowRun, Step};

/// Account flags the issuer sets before issuing.
///
/// The ledger refuses clawback-enabled without revocable.
pub const ISSUER_FLAGS: u32 = AUTH_REQUIRED_FLAG | AUTH_REVOCABLE_FLAG | AUTH_CLAWBACK_ENABLED_FLAG;

/// Issues two assets under clawback and claws part of one back.
///
/// Steps:
/// 1. `enable-clawback`: the issuer sets [`ISSUER_FLAGS`]. Trustlines only
///    inherit the clawback flag from an issuer that had it set in an
///    earlier transaction, so this is a transaction of its own.
/// 2. `trust`: the holder trusts both assets.
/// 3. `authorize-and-issue`: the issuer authorizes both trustlines and pays
///    the holder.
/// 4. `clawback`: the issuer claws back part of the clawback asset, leaving
///    the remainder with the holder.
#[derive(Debug, Clone)]
pub struct ClawbackFlow {
    pub issuer: SecretKey,
    pub holder: SecretKey,
    pub control_code: String,
    pub control_amount: i64,
    pub clawback_code: String,
    pub issued_amount: i64,
    pub clawback_amount: i64,
}

impl ClawbackFlow {
    /// 100 CONTROL, 500 CLAWBACK of which 250 are clawed back.
    pub fn new(issuer: SecretKey, holder: SecretKey) -> Self {
        Self {
            issuer,
            holder,
            control_code: "CONTROL".into(),
            control_amount: 100 * STROOPS_PER_UNIT,
            clawback_code: "CLAWBACK".into(),
            issued_amount: 500 * STROOPS_PER_UNIT,
            clawback_amount: 250 * STROOPS_PER_UNIT,
        }
    }

    pub fn control_asset(&self) -> Result<Asset> {
        Ok(Asset::credit(&self.control_code, self.issuer.public_key())?)
    }

    pub fn clawback_asset(&self) -> Result<Asset> {
        Ok(Asset::credit(&self.clawback_code, self.issuer.public_key())?)
    }
}

#[async_trait]
impl Flow for ClawbackFlow {
    type Output = ();

    fn name(&self) -> &str {
        "clawback"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        let control = self.control_asset()?;
        let clawback = self.clawback_asset()?;
        let holder = self.holder.public_key();

        run.submit(Step::new(
            "enable-clawback",
            &self.issuer,
            vec![Operation::set_options(SetOptions {
                set_flags: Some(ISSUER_FLAGS),
                ..Default::default()
            })],
        ))
        .await?;

        run.submit(Step::new(
            "trust",
            &self.holder,
            vec![
                Operation::change_trust(control.clone(), i64::MAX),
                Operation::change_trust(clawback.clone(), i64::MAX),
            ],
        ))
        .await?;

        run.submit(Step::new(
            "authorize-and-issue",
            &self.issuer,
            vec![
                Operation::set_trust_line_flags(holder, control.clone(), 0, TRUSTLINE_AUTHORIZED_FLAG),
                Operation::set_trust_line_flags(holder, clawback.clone(), 0, TRUSTLINE_AUTHORIZED_FLAG),
                Operation::payment(holder, control, self.control_amount),
                Operation::payment(holder, clawback.clone(), self.issued_amount),
            ],
        ))
        .await?;

        run.submit(Step::new(
            "clawback",
            &self.issuer,
            vec![Operation::clawback(clawback, holder, self.clawback_amount)],
        ))
        .await?;
        Ok(())
    }
}
