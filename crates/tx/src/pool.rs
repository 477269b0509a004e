//! Constant-product liquidity pool identity.
//!
//! A pool id is `sha256(xdr(LiquidityPoolParameters))` over the asset pair in
//! canonical order and the fee in basis points. Any party holding the same
//! inputs derives the same id, regardless of the order it names the assets.

use std::fmt;

use questline_common::asset::LIQUIDITY_POOL_FEE_V18;
use questline_common::Hash256;
use stellar_xdr::curr::{LiquidityPoolConstantProductParameters, LiquidityPoolParameters, PoolId};

use crate::asset::Asset;
use crate::error::TxError;

/// The only fee the ledger accepts for constant-product pools.
pub const POOL_FEE_BPS: i32 = LIQUIDITY_POOL_FEE_V18;

/// Canonicalized pool parameters: `asset_a < asset_b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolParameters {
    asset_a: Asset,
    asset_b: Asset,
    fee_bps: i32,
}

impl PoolParameters {
    /// Orders the pair canonically. Identical assets never form a pool.
    pub fn new(first: Asset, second: Asset, fee_bps: i32) -> Result<Self, TxError> {
        if first == second {
            return Err(TxError::Validation(format!(
                "pool assets must differ, got {} twice",
                first
            )));
        }
        if fee_bps != POOL_FEE_BPS {
            return Err(TxError::Validation(format!(
                "pool fee must be {} bps, got {}",
                POOL_FEE_BPS, fee_bps
            )));
        }
        let (asset_a, asset_b) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        Ok(Self {
            asset_a,
            asset_b,
            fee_bps,
        })
    }

    pub fn constant_product(first: Asset, second: Asset) -> Result<Self, TxError> {
        Self::new(first, second, POOL_FEE_BPS)
    }

    pub fn asset_a(&self) -> &Asset {
        &self.asset_a
    }

    pub fn asset_b(&self) -> &Asset {
        &self.asset_b
    }

    pub fn fee_bps(&self) -> i32 {
        self.fee_bps
    }

    pub fn to_xdr(&self) -> LiquidityPoolParameters {
        LiquidityPoolParameters::LiquidityPoolConstantProduct(LiquidityPoolConstantProductParameters {
            asset_a: self.asset_a.to_xdr(),
            asset_b: self.asset_b.to_xdr(),
            fee: self.fee_bps,
        })
    }

    pub fn pool_id(&self) -> Result<LiquidityPoolId, TxError> {
        Ok(LiquidityPoolId(Hash256::hash_xdr(&self.to_xdr())?))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiquidityPoolId(pub Hash256);

impl LiquidityPoolId {
    /// Derives the id for `(a, b, fee_bps)`; argument order does not matter.
    pub fn derive(a: &Asset, b: &Asset, fee_bps: i32) -> Result<Self, TxError> {
        PoolParameters::new(a.clone(), b.clone(), fee_bps)?.pool_id()
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        Hash256::from_hex(s)
            .map(Self)
            .map_err(|e| TxError::Validation(format!("pool id '{}': {}", s, e)))
    }

    pub fn to_xdr(&self) -> PoolId {
        PoolId(self.0.into())
    }
}

impl fmt::Debug for LiquidityPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiquidityPoolId({})", self.to_hex())
    }
}

impl fmt::Display for LiquidityPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<&PoolId> for LiquidityPoolId {
    fn from(id: &PoolId) -> Self {
        Self(Hash256::from(id.0.clone()))
    }
}
