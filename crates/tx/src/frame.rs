//! Envelope access and hashing.
//!
//! [`TransactionFrame`] gives one view over plain and fee-bump envelopes.
//! The hash that signers sign is `sha256(xdr(TransactionSignaturePayload))`,
//! which folds in the network id: a signature made for one network never
//! verifies on another.

use base64::Engine;
use questline_common::{Hash256, NetworkId};
use questline_crypto::PublicKey;
use stellar_xdr::curr::{
    DecoratedSignature, FeeBumpTransaction, FeeBumpTransactionInnerTx, Limits, Operation,
    Preconditions, ReadXdr, TimeBounds, Transaction, TransactionEnvelope,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};

use crate::error::TxError;

/// Contents hash of a plain transaction on `network`.
pub fn transaction_hash(tx: &Transaction, network: &NetworkId) -> Result<Hash256, TxError> {
    payload_hash(TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()), network)
}

/// Contents hash of a fee-bump wrapper on `network`.
pub fn fee_bump_hash(tx: &FeeBumpTransaction, network: &NetworkId) -> Result<Hash256, TxError> {
    payload_hash(
        TransactionSignaturePayloadTaggedTransaction::TxFeeBump(tx.clone()),
        network,
    )
}

fn payload_hash(
    tagged: TransactionSignaturePayloadTaggedTransaction,
    network: &NetworkId,
) -> Result<Hash256, TxError> {
    let payload = TransactionSignaturePayload {
        network_id: (*network).into(),
        tagged_transaction: tagged,
    };
    Ok(Hash256::hash_xdr(&payload)?)
}

/// Read-only view over a transaction envelope.
#[derive(Debug, Clone)]
pub struct TransactionFrame {
    envelope: TransactionEnvelope,
}

impl TransactionFrame {
    pub fn new(envelope: TransactionEnvelope) -> Self {
        Self { envelope }
    }

    pub fn from_base64(b64: &str) -> Result<Self, TxError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| TxError::Validation(format!("envelope is not base64: {}", e)))?;
        Ok(Self::new(TransactionEnvelope::from_xdr(bytes, Limits::none())?))
    }

    pub fn to_base64(&self) -> Result<String, TxError> {
        let bytes = self.envelope.to_xdr(Limits::none())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn into_envelope(self) -> TransactionEnvelope {
        self.envelope
    }

    /// Hash of the outermost transaction; this is the id the ledger reports.
    pub fn hash(&self, network: &NetworkId) -> Result<Hash256, TxError> {
        match &self.envelope {
            TransactionEnvelope::TxV0(_) => Err(TxError::Validation(
                "v0 envelopes are not supported".into(),
            )),
            TransactionEnvelope::Tx(env) => transaction_hash(&env.tx, network),
            TransactionEnvelope::TxFeeBump(env) => fee_bump_hash(&env.tx, network),
        }
    }

    /// Hash of the transaction whose sequence number is consumed.
    pub fn inner_hash(&self, network: &NetworkId) -> Result<Hash256, TxError> {
        match self.inner_tx() {
            Some(tx) => transaction_hash(tx, network),
            None => Err(TxError::Validation("v0 envelopes are not supported".into())),
        }
    }

    fn inner_tx(&self) -> Option<&Transaction> {
        match &self.envelope {
            TransactionEnvelope::TxV0(_) => None,
            TransactionEnvelope::Tx(env) => Some(&env.tx),
            TransactionEnvelope::TxFeeBump(env) => match &env.tx.inner_tx {
                FeeBumpTransactionInnerTx::Tx(inner) => Some(&inner.tx),
            },
        }
    }

    pub fn is_fee_bump(&self) -> bool {
        matches!(self.envelope, TransactionEnvelope::TxFeeBump(_))
    }

    /// Account whose sequence number the transaction consumes.
    pub fn source_account(&self) -> Result<PublicKey, TxError> {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => {
                Ok(PublicKey::from_bytes(&env.tx.source_account_ed25519.0)?)
            }
            _ => match self.inner_tx() {
                Some(tx) => Ok(PublicKey::try_from(&tx.source_account)?),
                None => Err(TxError::Validation("envelope has no source".into())),
            },
        }
    }

    /// Account charged the fee: the outer source for a fee bump.
    pub fn fee_source(&self) -> Result<PublicKey, TxError> {
        match &self.envelope {
            TransactionEnvelope::TxFeeBump(env) => Ok(PublicKey::try_from(&env.tx.fee_source)?),
            _ => self.source_account(),
        }
    }

    pub fn sequence_number(&self) -> i64 {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.tx.seq_num.0,
            _ => self.inner_tx().map(|tx| tx.seq_num.0).unwrap_or_default(),
        }
    }

    /// Fee bid by whoever pays: the outer fee for a fee bump.
    pub fn fee(&self) -> i64 {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.tx.fee as i64,
            TransactionEnvelope::Tx(env) => env.tx.fee as i64,
            TransactionEnvelope::TxFeeBump(env) => env.tx.fee,
        }
    }

    pub fn inner_fee(&self) -> i64 {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.tx.fee as i64,
            _ => self.inner_tx().map(|tx| tx.fee as i64).unwrap_or_default(),
        }
    }

    pub fn operations(&self) -> &[Operation] {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.tx.operations.as_slice(),
            _ => self.inner_tx().map(|tx| tx.operations.as_slice()).unwrap_or(&[]),
        }
    }

    pub fn operation_count(&self) -> usize {
        self.operations().len()
    }

    pub fn time_bounds(&self) -> Option<TimeBounds> {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.tx.time_bounds.clone(),
            _ => match self.inner_tx().map(|tx| &tx.cond) {
                Some(Preconditions::Time(tb)) => Some(tb.clone()),
                Some(Preconditions::V2(v2)) => v2.time_bounds.clone(),
                _ => None,
            },
        }
    }

    /// Signatures on the outermost envelope.
    pub fn signatures(&self) -> &[DecoratedSignature] {
        match &self.envelope {
            TransactionEnvelope::TxV0(env) => env.signatures.as_slice(),
            TransactionEnvelope::Tx(env) => env.signatures.as_slice(),
            TransactionEnvelope::TxFeeBump(env) => env.signatures.as_slice(),
        }
    }

    /// Signatures over the inner transaction; same as [`signatures`] for a
    /// plain envelope.
    ///
    /// [`signatures`]: TransactionFrame::signatures
    pub fn inner_signatures(&self) -> &[DecoratedSignature] {
        match &self.envelope {
            TransactionEnvelope::TxFeeBump(env) => match &env.tx.inner_tx {
                FeeBumpTransactionInnerTx::Tx(inner) => inner.signatures.as_slice(),
            },
            _ => self.signatures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_crypto::SecretKey;
    use stellar_xdr::curr::{
        Memo, MuxedAccount, SequenceNumber, TimePoint, TransactionExt, TransactionV1Envelope,
        Uint256, VecM,
    };

    fn sample_tx(seq: i64) -> Transaction {
        let source = SecretKey::from_seed(&[1u8; 32]).public_key();
        Transaction {
            source_account: MuxedAccount::Ed25519(Uint256(*source.as_bytes())),
            fee: 100,
            seq_num: SequenceNumber(seq),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(1_000),
            }),
            memo: Memo::None,
            operations: VecM::default(),
            ext: TransactionExt::V0,
        }
    }

    #[test]
    fn test_hash_depends_on_network() {
        let tx = sample_tx(1);
        let test = transaction_hash(&tx, &NetworkId::testnet()).unwrap();
        let main = transaction_hash(&tx, &NetworkId::mainnet()).unwrap();
        assert_ne!(test, main);
        assert_eq!(test, transaction_hash(&tx, &NetworkId::testnet()).unwrap());
    }

    #[test]
    fn test_frame_accessors_and_base64() {
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: sample_tx(42),
            signatures: VecM::default(),
        });
        let frame = TransactionFrame::new(envelope);
        assert_eq!(frame.sequence_number(), 42);
        assert_eq!(frame.fee(), 100);
        assert!(!frame.is_fee_bump());
        assert_eq!(frame.time_bounds().unwrap().max_time, TimePoint(1_000));
        assert_eq!(
            frame.source_account().unwrap(),
            SecretKey::from_seed(&[1u8; 32]).public_key()
        );

        let b64 = frame.to_base64().unwrap();
        let decoded = TransactionFrame::from_base64(&b64).unwrap();
        assert_eq!(
            decoded.hash(&NetworkId::testnet()).unwrap(),
            frame.hash(&NetworkId::testnet()).unwrap()
        );
    }
}
