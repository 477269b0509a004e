//! Fee-bump wrapping.
//!
//! A fee bump re-prices an already signed transaction: the outer envelope
//! names a fee source and a new fee, and carries the inner envelope with its
//! signatures exactly as they were. The ledger charges a fee bump for one
//! extra virtual operation, so the outer fee must cover
//! `base_fee * (inner_ops + 1)` and must never be below the inner fee.

use questline_crypto::PublicKey;
use stellar_xdr::curr::{
    FeeBumpTransaction, FeeBumpTransactionExt, FeeBumpTransactionInnerTx, TransactionEnvelope,
};
use tracing::debug;

use crate::error::TxError;
use crate::signing::SignedTransaction;

/// Smallest outer fee the ledger accepts for wrapping a transaction of
/// `inner_ops` operations bidding `inner_fee`.
pub fn minimum_outer_fee(inner_ops: usize, inner_fee: i64, base_fee: u32) -> i64 {
    let min_fee = (inner_ops as i64 + 1).saturating_mul(base_fee as i64);
    std::cmp::max(min_fee, inner_fee)
}

/// Checks an outer fee against [`minimum_outer_fee`].
pub fn validate_outer_fee(
    outer_fee: i64,
    inner_ops: usize,
    inner_fee: i64,
    base_fee: u32,
) -> Result<(), TxError> {
    let required_min = minimum_outer_fee(inner_ops, inner_fee, base_fee);
    if outer_fee < required_min {
        return Err(TxError::InsufficientOuterFee {
            outer_fee,
            required_min,
        });
    }
    Ok(())
}

/// Wraps a signed transaction in an unsigned fee-bump envelope.
///
/// The inner envelope is cloned, never modified. The result must be signed
/// by the fee source through
/// [`SigningCoordinator::sign_fee_bump`](crate::signing::SigningCoordinator::sign_fee_bump).
pub fn wrap(
    fee_source: &PublicKey,
    outer_fee: i64,
    base_fee: u32,
    inner: &SignedTransaction,
) -> Result<FeeBumpTransaction, TxError> {
    let inner_env = match inner.envelope() {
        TransactionEnvelope::Tx(env) => env.clone(),
        TransactionEnvelope::TxFeeBump(_) => {
            return Err(TxError::InvalidInner("inner is already a fee bump".into()))
        }
        TransactionEnvelope::TxV0(_) => {
            return Err(TxError::InvalidInner("v0 inner envelopes are not supported".into()))
        }
    };
    if inner_env.signatures.is_empty() {
        return Err(TxError::InvalidInner("inner transaction is unsigned".into()));
    }

    validate_outer_fee(
        outer_fee,
        inner_env.tx.operations.len(),
        inner_env.tx.fee as i64,
        base_fee,
    )?;

    debug!(
        fee_source = %fee_source,
        outer_fee,
        inner_hash = %inner.hash(),
        "Wrapping transaction in fee bump"
    );

    Ok(FeeBumpTransaction {
        fee_source: fee_source.to_muxed_account(),
        fee: outer_fee,
        inner_tx: FeeBumpTransactionInnerTx::Tx(inner_env),
        ext: FeeBumpTransactionExt::V0,
    })
}

/// Wraps at exactly `base_fee` per operation, including the virtual one,
/// raised to the inner fee if that is higher.
pub fn wrap_at_base_fee(
    fee_source: &PublicKey,
    base_fee: u32,
    inner: &SignedTransaction,
) -> Result<FeeBumpTransaction, TxError> {
    let frame = inner.frame();
    let outer_fee = minimum_outer_fee(frame.operation_count(), frame.inner_fee(), base_fee);
    wrap(fee_source, outer_fee, base_fee, inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::asset::Asset;
    use crate::builder::{TransactionBuilder, DEFAULT_TIMEOUT};
    use crate::operations::Operation;
    use crate::signing::SigningCoordinator;
    use questline_common::{ManualClock, NetworkId};
    use questline_crypto::SecretKey;
    use std::sync::Arc;

    fn signed_inner(inner_key: &SecretKey, fee_per_op: u32) -> SignedTransaction {
        let builder = TransactionBuilder::new(Arc::new(ManualClock::new(0)));
        let account = Account::loaded(inner_key.public_key(), 10, 0);
        let unsigned = builder
            .build(
                &account,
                vec![Operation::payment(
                    SecretKey::from_seed(&[9u8; 32]).public_key(),
                    Asset::Native,
                    1_000,
                )],
                fee_per_op,
                DEFAULT_TIMEOUT,
            )
            .unwrap();
        SigningCoordinator::new(NetworkId::testnet())
            .sign(unsigned, &[inner_key])
            .unwrap()
    }

    #[test]
    fn test_minimum_fee_rule() {
        assert_eq!(minimum_outer_fee(1, 100, 100), 200);
        assert_eq!(minimum_outer_fee(1, 500, 100), 500);
        assert_eq!(minimum_outer_fee(3, 0, 100), 400);
    }

    #[test]
    fn test_outer_fee_below_minimum_rejected() {
        let inner_key = SecretKey::from_seed(&[1u8; 32]);
        let payer = SecretKey::from_seed(&[2u8; 32]).public_key();
        let inner = signed_inner(&inner_key, 100);
        match wrap(&payer, 150, 100, &inner) {
            Err(TxError::InsufficientOuterFee {
                outer_fee,
                required_min,
            }) => {
                assert_eq!(outer_fee, 150);
                assert_eq!(required_min, 200);
            }
            other => panic!("expected InsufficientOuterFee, got {:?}", other),
        }
    }

    #[test]
    fn test_wrap_preserves_inner() {
        let inner_key = SecretKey::from_seed(&[1u8; 32]);
        let payer = SecretKey::from_seed(&[2u8; 32]);
        let inner = signed_inner(&inner_key, 100);
        let before = inner.envelope().clone();

        let outer = wrap_at_base_fee(&payer.public_key(), 100, &inner).unwrap();
        assert_eq!(outer.fee, 200);
        let FeeBumpTransactionInnerTx::Tx(wrapped) = &outer.inner_tx;
        assert_eq!(TransactionEnvelope::Tx(wrapped.clone()), before);
        assert_eq!(inner.envelope(), &before);

        let coordinator = SigningCoordinator::new(NetworkId::testnet());
        let signed_outer = coordinator.sign_fee_bump(outer, &[&payer]).unwrap();
        assert!(signed_outer.is_fee_bump());
        assert_ne!(signed_outer.hash(), inner.hash());
        assert_eq!(signed_outer.frame().inner_hash(&NetworkId::testnet()).unwrap(), inner.hash());
    }

    #[test]
    fn test_double_wrap_rejected() {
        let inner_key = SecretKey::from_seed(&[1u8; 32]);
        let payer = SecretKey::from_seed(&[2u8; 32]);
        let inner = signed_inner(&inner_key, 100);
        let outer = wrap_at_base_fee(&payer.public_key(), 100, &inner).unwrap();
        let signed_outer = SigningCoordinator::new(NetworkId::testnet())
            .sign_fee_bump(outer, &[&payer])
            .unwrap();
        assert!(matches!(
            wrap(&payer.public_key(), 10_000, 100, &signed_outer),
            Err(TxError::InvalidInner(_))
        ));
    }
}
