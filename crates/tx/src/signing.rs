//! Signing coordinator.
//!
//! Signing is purely local: every key signs the network-bound contents hash
//! and the signature is attached with its hint. The coordinator knows
//! nothing about account thresholds, so an under-weighted transaction signs
//! fine and is rejected by the ledger at submission.

use std::collections::BTreeSet;

use questline_common::{Hash256, NetworkId};
use questline_crypto::{decorated_signature, PublicKey, SecretKey};
use stellar_xdr::curr::{
    DecoratedSignature, FeeBumpTransaction, FeeBumpTransactionEnvelope, TransactionEnvelope,
    TransactionV1Envelope, VecM,
};
use tracing::trace;

use crate::builder::UnsignedTransaction;
use crate::error::TxError;
use crate::frame::{fee_bump_hash, TransactionFrame};

/// Most signatures one envelope may carry.
pub const MAX_SIGNATURES: usize = 20;

/// An envelope with at least one signature, plus the hash those signatures
/// cover.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    envelope: TransactionEnvelope,
    hash: Hash256,
    signers: BTreeSet<PublicKey>,
}

impl SignedTransaction {
    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    /// Hash of the outermost transaction, as reported by the ledger.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// Keys whose signatures are attached to the outermost envelope.
    pub fn signers(&self) -> &BTreeSet<PublicKey> {
        &self.signers
    }

    pub fn frame(&self) -> TransactionFrame {
        TransactionFrame::new(self.envelope.clone())
    }

    pub fn to_base64(&self) -> Result<String, TxError> {
        self.frame().to_base64()
    }

    pub fn is_fee_bump(&self) -> bool {
        matches!(self.envelope, TransactionEnvelope::TxFeeBump(_))
    }

    pub fn sequence(&self) -> i64 {
        self.frame().sequence_number()
    }

    pub fn fee(&self) -> i64 {
        self.frame().fee()
    }

    pub fn signature_count(&self) -> usize {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.signatures.len(),
            TransactionEnvelope::Tx(env) => env.signatures.len(),
            TransactionEnvelope::TxFeeBump(env) => env.signatures.len(),
        }
    }
}

/// Signs envelopes for one network.
#[derive(Debug, Clone, Copy)]
pub struct SigningCoordinator {
    network: NetworkId,
}

impl SigningCoordinator {
    pub fn new(network: NetworkId) -> Self {
        Self { network }
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network
    }

    /// Signs a freshly built transaction with every key in `keys`.
    ///
    /// The resulting set of signatures does not depend on key order; a key
    /// given twice signs once.
    pub fn sign(
        &self,
        unsigned: UnsignedTransaction,
        keys: &[&SecretKey],
    ) -> Result<SignedTransaction, TxError> {
        let hash = unsigned.hash(&self.network)?;
        let mut signers = BTreeSet::new();
        let signatures = attach(Vec::new(), &mut signers, &hash, keys)?;
        trace!(hash = %hash, signers = signers.len(), "Signed transaction");
        Ok(SignedTransaction {
            envelope: TransactionEnvelope::Tx(TransactionV1Envelope {
                tx: unsigned.into_transaction(),
                signatures: signatures.try_into()?,
            }),
            hash,
            signers,
        })
    }

    /// Adds signatures from further keys to an already signed envelope.
    ///
    /// For a fee bump this signs the outer wrapper; the inner transaction is
    /// never touched.
    pub fn cosign(
        &self,
        signed: SignedTransaction,
        keys: &[&SecretKey],
    ) -> Result<SignedTransaction, TxError> {
        let SignedTransaction {
            envelope,
            hash,
            mut signers,
        } = signed;
        let envelope = match envelope {
            TransactionEnvelope::Tx(mut env) => {
                let sigs = attach(env.signatures.to_vec(), &mut signers, &hash, keys)?;
                env.signatures = sigs.try_into()?;
                TransactionEnvelope::Tx(env)
            }
            TransactionEnvelope::TxFeeBump(mut env) => {
                let sigs = attach(env.signatures.to_vec(), &mut signers, &hash, keys)?;
                env.signatures = sigs.try_into()?;
                TransactionEnvelope::TxFeeBump(env)
            }
            TransactionEnvelope::TxV0(_) => {
                return Err(TxError::Validation("v0 envelopes are not supported".into()))
            }
        };
        Ok(SignedTransaction {
            envelope,
            hash,
            signers,
        })
    }

    /// Signs a fee-bump wrapper with the fee-paying keys.
    pub fn sign_fee_bump(
        &self,
        outer: FeeBumpTransaction,
        keys: &[&SecretKey],
    ) -> Result<SignedTransaction, TxError> {
        let hash = fee_bump_hash(&outer, &self.network)?;
        let mut signers = BTreeSet::new();
        let signatures = attach(Vec::new(), &mut signers, &hash, keys)?;
        trace!(hash = %hash, "Signed fee bump");
        Ok(SignedTransaction {
            envelope: TransactionEnvelope::TxFeeBump(FeeBumpTransactionEnvelope {
                tx: outer,
                signatures: signatures.try_into()?,
            }),
            hash,
            signers,
        })
    }
}

fn attach(
    mut signatures: Vec<DecoratedSignature>,
    signers: &mut BTreeSet<PublicKey>,
    hash: &Hash256,
    keys: &[&SecretKey],
) -> Result<Vec<DecoratedSignature>, TxError> {
    for key in keys {
        if !signers.insert(key.public_key()) {
            continue;
        }
        signatures.push(decorated_signature(key, hash)?);
    }
    if signatures.len() > MAX_SIGNATURES {
        return Err(TxError::TooManySignatures(signatures.len()));
    }
    // Canonical order so the envelope bytes do not depend on key order.
    signatures.sort_by(|a, b| {
        (a.hint.0, a.signature.0.as_slice()).cmp(&(b.hint.0, b.signature.0.as_slice()))
    });
    Ok(signatures)
}

impl From<SignedTransaction> for TransactionEnvelope {
    fn from(signed: SignedTransaction) -> Self {
        signed.envelope
    }
}

/// Signatures attached to the outermost envelope.
pub fn signature_set(signed: &SignedTransaction) -> VecM<DecoratedSignature, 20> {
    match &signed.envelope {
        TransactionEnvelope::TxV0(env) => env.signatures.clone(),
        TransactionEnvelope::Tx(env) => env.signatures.clone(),
        TransactionEnvelope::TxFeeBump(env) => env.signatures.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::asset::Asset;
    use crate::builder::{TransactionBuilder, DEFAULT_TIMEOUT};
    use crate::operations::Operation;
    use questline_common::ManualClock;
    use questline_crypto::verify_decorated;
    use std::sync::Arc;

    fn unsigned(source: &SecretKey) -> UnsignedTransaction {
        let builder = TransactionBuilder::new(Arc::new(ManualClock::new(100)));
        let account = Account::loaded(source.public_key(), 7, 100);
        builder
            .build(
                &account,
                vec![Operation::payment(
                    SecretKey::from_seed(&[2u8; 32]).public_key(),
                    Asset::Native,
                    5,
                )],
                100,
                DEFAULT_TIMEOUT,
            )
            .unwrap()
    }

    #[test]
    fn test_signatures_verify_against_hash() {
        let source = SecretKey::from_seed(&[1u8; 32]);
        let coordinator = SigningCoordinator::new(NetworkId::testnet());
        let signed = coordinator.sign(unsigned(&source), &[&source]).unwrap();
        let sigs = signature_set(&signed);
        assert_eq!(sigs.len(), 1);
        assert!(verify_decorated(&source.public_key(), &signed.hash(), &sigs[0]));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = SecretKey::from_seed(&[1u8; 32]);
        let b = SecretKey::from_seed(&[3u8; 32]);
        let coordinator = SigningCoordinator::new(NetworkId::testnet());
        let ab = coordinator.sign(unsigned(&a), &[&a, &b]).unwrap();
        let ba = coordinator.sign(unsigned(&a), &[&b, &a, &b]).unwrap();
        assert_eq!(signature_set(&ab), signature_set(&ba));
        assert_eq!(ab.signature_count(), 2);
    }

    #[test]
    fn test_network_changes_hash() {
        let source = SecretKey::from_seed(&[1u8; 32]);
        let test = SigningCoordinator::new(NetworkId::testnet())
            .sign(unsigned(&source), &[&source])
            .unwrap();
        let main = SigningCoordinator::new(NetworkId::mainnet())
            .sign(unsigned(&source), &[&source])
            .unwrap();
        assert_ne!(test.hash(), main.hash());
    }

    #[test]
    fn test_cosign_adds_only_new_keys() {
        let a = SecretKey::from_seed(&[1u8; 32]);
        let b = SecretKey::from_seed(&[3u8; 32]);
        let coordinator = SigningCoordinator::new(NetworkId::testnet());
        let signed = coordinator.sign(unsigned(&a), &[&a]).unwrap();
        let hash = signed.hash();
        let cosigned = coordinator.cosign(signed, &[&a, &b]).unwrap();
        assert_eq!(cosigned.signature_count(), 2);
        assert_eq!(cosigned.hash(), hash);
        assert!(cosigned.signers().contains(&b.public_key()));
    }
}
