use async_trait::async_trait;
use questline_common::{Price, STROOPS_PER_UNIT};
use questline_crypto::SecretKey;
use questline_tx::{Asset, LiquidityPoolId, Operation, PoolParameters};
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::orchestrator::{Flow, FlowRun, Step};

/// Amounts a provider puts into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolDeposit {
    pub native: i64,
    pub asset: i64,
}

/// Trades through a constant-product pool pairing XLM with an issued asset.
///
/// Steps:
/// 1. `deposit` (optional): the provider trusts the asset, receives
///    `issued_amount` from the issuer, trusts the pool and deposits.
/// 2. `swap`: the provider path-pays XLM to itself, converted to the asset
///    through the pool.
/// 3. `withdraw`: the provider redeems every pool share it holds.
///
/// Without a deposit the pool must already hold reserves, and the withdraw
/// step is refused locally unless the provider holds shares from an
/// earlier deposit.
#[derive(Debug, Clone)]
pub struct LiquidityPoolFlow {
    pub issuer: SecretKey,
    pub provider: SecretKey,
    pub code: String,
    pub issued_amount: i64,
    pub deposit: Option<PoolDeposit>,
    pub swap_amount: i64,
}

impl LiquidityPoolFlow {
    /// Issues 1000 units and deposits 100 XLM against 100 units, then swaps
    /// 10 XLM.
    pub fn new(issuer: SecretKey, provider: SecretKey, code: impl Into<String>) -> Self {
        Self {
            issuer,
            provider,
            code: code.into(),
            issued_amount: 1000 * STROOPS_PER_UNIT,
            deposit: Some(PoolDeposit {
                native: 100 * STROOPS_PER_UNIT,
                asset: 100 * STROOPS_PER_UNIT,
            }),
            swap_amount: 10 * STROOPS_PER_UNIT,
        }
    }

    pub fn without_deposit(mut self) -> Self {
        self.deposit = None;
        self
    }

    pub fn asset(&self) -> Result<Asset> {
        Ok(Asset::credit(&self.code, self.issuer.public_key())?)
    }

    /// Pool parameters in canonical order.
    pub fn pool(&self) -> Result<PoolParameters> {
        Ok(PoolParameters::constant_product(Asset::Native, self.asset()?)?)
    }

    fn deposit_step(&self, params: &PoolParameters, pool_id: LiquidityPoolId, deposit: PoolDeposit) -> Result<Step> {
        let asset = self.asset()?;
        let provider = self.provider.public_key();
        let (max_a, max_b) = if params.asset_a().is_native() {
            (deposit.native, deposit.asset)
        } else {
            (deposit.asset, deposit.native)
        };
        // Any price is acceptable for the opening deposit.
        let min_price = Price { n: 1, d: i32::MAX };
        let max_price = Price { n: i32::MAX, d: 1 };

        Ok(Step::new(
            "deposit",
            &self.provider,
            vec![
                Operation::change_trust(asset.clone(), i64::MAX),
                Operation::payment(provider, asset, self.issued_amount)
                    .with_source(self.issuer.public_key()),
                Operation::change_trust_pool(params.clone(), i64::MAX),
                Operation::liquidity_pool_deposit(pool_id, max_a, max_b, min_price, max_price),
            ],
        )
        .cosigned_by(&self.issuer))
    }
}

#[async_trait]
impl Flow for LiquidityPoolFlow {
    type Output = LiquidityPoolId;

    fn name(&self) -> &str {
        "liquidity-pool"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<LiquidityPoolId> {
        let params = self.pool()?;
        let pool_id = params.pool_id()?;
        let provider = self.provider.public_key();
        debug!(pool = %pool_id, "Derived pool id");

        if let Some(deposit) = self.deposit {
            run.submit(self.deposit_step(&params, pool_id, deposit)?).await?;
        }

        run.submit(Step::new(
            "swap",
            &self.provider,
            vec![Operation::path_payment_strict_send(
                Asset::Native,
                self.swap_amount,
                provider,
                self.asset()?,
                1,
                Vec::new(),
            )],
        ))
        .await?;

        let account = run.load_account(&provider).await?;
        let shares = account
            .pool_shares(&pool_id)
            .map(|b| b.amount)
            .filter(|&amount| amount > 0)
            .ok_or_else(|| {
                FlowError::validation(format!("{} holds no shares of pool {}", provider, pool_id))
            })?;

        run.submit(Step::new(
            "withdraw",
            &self.provider,
            vec![Operation::liquidity_pool_withdraw(pool_id, shares, 0, 0)],
        ))
        .await?;
        Ok(pool_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_does_not_depend_on_argument_order() {
        let issuer = SecretKey::from_seed(&[1; 32]);
        let flow = LiquidityPoolFlow::new(issuer.clone(), SecretKey::from_seed(&[2; 32]), "SPQ");
        let asset = flow.asset().unwrap();
        let swapped = PoolParameters::constant_product(asset, Asset::Native).unwrap();
        assert_eq!(flow.pool().unwrap().pool_id().unwrap(), swapped.pool_id().unwrap());
    }

    #[test]
    fn test_deposit_amounts_follow_canonical_order() {
        let flow = LiquidityPoolFlow::new(
            SecretKey::from_seed(&[1; 32]),
            SecretKey::from_seed(&[2; 32]),
            "SPQ",
        );
        let params = flow.pool().unwrap();
        let deposit = PoolDeposit { native: 7, asset: 9 };
        let step = flow
            .deposit_step(&params, params.pool_id().unwrap(), deposit)
            .unwrap();
        assert_eq!(step.signers.len(), 2);
        match &step.operations[3].body {
            questline_tx::OperationBody::LiquidityPoolDeposit {
                max_amount_a,
                max_amount_b,
                ..
            } => assert_eq!((*max_amount_a, *max_amount_b), (7, 9)),
            other => panic!("unexpected operation {:?}", other),
        }
    }
}
