//! Transaction assembly.
//!
//! [`TransactionBuilder::build`] turns a fresh account snapshot and a list of
//! operations into an [`UnsignedTransaction`]: validated operations, a fee of
//! `fee_per_op * ops`, the next sequence number, and an expiry `timeout`
//! after the builder's clock. The snapshot itself is never modified, so
//! callers must reload the account after submitting.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use questline_common::{Clock, Hash256, NetworkId};
use questline_crypto::PublicKey;
use stellar_xdr::curr::{
    Memo, Preconditions, SequenceNumber, TimeBounds, TimePoint, Transaction, TransactionExt,
};
use tracing::debug;

use crate::account::Account;
use crate::error::TxError;
use crate::frame::transaction_hash;
use crate::operations::Operation;

/// Ledger-side expiry window when the caller has no preference.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Oldest snapshot the builder will spend a sequence number from.
pub const DEFAULT_MAX_SNAPSHOT_AGE: Duration = Duration::from_secs(60);
/// Most operations one transaction may carry.
pub const MAX_OPERATIONS: usize = 100;
/// Minimum per-operation fee on the public networks, in stroops.
pub const BASE_FEE: u32 = 100;

/// A built transaction awaiting signatures.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    tx: Transaction,
    source: PublicKey,
    required_signers: BTreeSet<PublicKey>,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn source(&self) -> &PublicKey {
        &self.source
    }

    pub fn sequence(&self) -> i64 {
        self.tx.seq_num.0
    }

    pub fn fee(&self) -> u32 {
        self.tx.fee
    }

    pub fn operation_count(&self) -> usize {
        self.tx.operations.len()
    }

    /// Unix second after which the ledger rejects the transaction.
    pub fn expires_at(&self) -> u64 {
        match &self.tx.cond {
            Preconditions::Time(tb) => tb.max_time.0,
            _ => 0,
        }
    }

    /// Transaction source plus every distinct operation source override.
    ///
    /// This is who must sign; it says nothing about how much weight each
    /// signature carries.
    pub fn required_signers(&self) -> &BTreeSet<PublicKey> {
        &self.required_signers
    }

    pub fn hash(&self, network: &NetworkId) -> Result<Hash256, TxError> {
        transaction_hash(&self.tx, network)
    }
}

/// Builds transactions against the time reported by a [`Clock`].
#[derive(Clone)]
pub struct TransactionBuilder {
    clock: Arc<dyn Clock>,
    max_snapshot_age: Duration,
}

impl std::fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("max_snapshot_age", &self.max_snapshot_age)
            .finish()
    }
}

impl TransactionBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_snapshot_age: DEFAULT_MAX_SNAPSHOT_AGE,
        }
    }

    pub fn with_max_snapshot_age(mut self, age: Duration) -> Self {
        self.max_snapshot_age = age;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Assembles an unsigned transaction.
    ///
    /// # Errors
    ///
    /// - [`TxError::NoOperations`] / [`TxError::TooManyOperations`]
    /// - [`TxError::InvalidOperation`] for the first malformed operation
    /// - [`TxError::StaleAccount`] if the snapshot was never loaded or is
    ///   older than the configured maximum age
    /// - [`TxError::FeeOverflow`] if the total fee does not fit
    pub fn build(
        &self,
        account: &Account,
        operations: Vec<Operation>,
        fee_per_op: u32,
        timeout: Duration,
    ) -> Result<UnsignedTransaction, TxError> {
        if operations.is_empty() {
            return Err(TxError::NoOperations);
        }
        if operations.len() > MAX_OPERATIONS {
            return Err(TxError::TooManyOperations(operations.len()));
        }

        for (index, op) in operations.iter().enumerate() {
            op.validate().map_err(|source| TxError::InvalidOperation {
                index,
                kind: op.kind(),
                source,
            })?;
        }

        let now = self.clock.now_unix();
        match account.loaded_at() {
            None => {
                return Err(TxError::StaleAccount {
                    account: account.id().to_string(),
                    reason: "snapshot was not loaded from the ledger".into(),
                })
            }
            Some(at) if !account.is_fresh(now, self.max_snapshot_age.as_secs()) => {
                return Err(TxError::StaleAccount {
                    account: account.id().to_string(),
                    reason: format!(
                        "loaded {}s ago, limit is {}s",
                        now.saturating_sub(at),
                        self.max_snapshot_age.as_secs()
                    ),
                })
            }
            Some(_) => {}
        }

        let fee = u32::try_from(operations.len())
            .ok()
            .and_then(|n| fee_per_op.checked_mul(n))
            .ok_or(TxError::FeeOverflow {
                per_op: fee_per_op,
                ops: operations.len(),
            })?;

        let sequence = account.next_sequence().ok_or_else(|| TxError::StaleAccount {
            account: account.id().to_string(),
            reason: "sequence number exhausted".into(),
        })?;

        let mut required_signers = BTreeSet::new();
        required_signers.insert(*account.id());
        required_signers.extend(operations.iter().filter_map(|op| op.source));

        let encoded = operations
            .iter()
            .map(Operation::to_xdr)
            .collect::<Result<Vec<_>, _>>()?;

        let tx = Transaction {
            source_account: account.id().to_muxed_account(),
            fee,
            seq_num: SequenceNumber(sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(now.saturating_add(timeout.as_secs())),
            }),
            memo: Memo::None,
            operations: encoded.try_into()?,
            ext: TransactionExt::V0,
        };

        debug!(
            source = %account.id(),
            sequence,
            fee,
            ops = operations.len(),
            "Built transaction"
        );

        Ok(UnsignedTransaction {
            tx,
            source: *account.id(),
            required_signers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use questline_common::ManualClock;
    use questline_crypto::SecretKey;

    fn key(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    fn builder_at(now: u64) -> (TransactionBuilder, ManualClock) {
        let clock = ManualClock::new(now);
        (TransactionBuilder::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_one_sequence_slot_regardless_of_ops() {
        let (builder, _) = builder_at(1_000);
        let account = Account::loaded(key(1), 500, 1_000);
        let ops = vec![
            Operation::payment(key(2), Asset::Native, 10),
            Operation::payment(key(3), Asset::Native, 10),
            Operation::manage_data("k", Some(b"v".to_vec())),
        ];
        let tx = builder.build(&account, ops, 100, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(tx.sequence(), 501);
        assert_eq!(tx.fee(), 300);
        assert_eq!(tx.expires_at(), 1_030);
        assert_eq!(account.sequence(), 500);
    }

    #[test]
    fn test_empty_operations_rejected() {
        let (builder, _) = builder_at(0);
        let account = Account::loaded(key(1), 1, 0);
        assert!(matches!(
            builder.build(&account, vec![], 100, DEFAULT_TIMEOUT),
            Err(TxError::NoOperations)
        ));
    }

    #[test]
    fn test_malformed_operation_names_index() {
        let (builder, _) = builder_at(0);
        let account = Account::loaded(key(1), 1, 0);
        let ops = vec![
            Operation::payment(key(2), Asset::Native, 10),
            Operation::payment(key(2), Asset::Native, 0),
        ];
        match builder.build(&account, ops, 100, DEFAULT_TIMEOUT) {
            Err(TxError::InvalidOperation { index, kind, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(kind, "payment");
            }
            other => panic!("expected InvalidOperation, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_and_offline_snapshots_rejected() {
        let (builder, clock) = builder_at(1_000);
        let op = || vec![Operation::bump_sequence(0)];

        let offline = Account::offline(key(1), 1);
        assert!(matches!(
            builder.build(&offline, op(), 100, DEFAULT_TIMEOUT),
            Err(TxError::StaleAccount { .. })
        ));
        assert!(builder
            .build(&offline.clone().assume_fresh(1_000), op(), 100, DEFAULT_TIMEOUT)
            .is_ok());

        let loaded = Account::loaded(key(1), 1, 1_000);
        clock.advance(Duration::from_secs(61));
        assert!(matches!(
            builder.build(&loaded, op(), 100, DEFAULT_TIMEOUT),
            Err(TxError::StaleAccount { .. })
        ));
    }

    #[test]
    fn test_required_signers_include_op_sources() {
        let (builder, _) = builder_at(0);
        let account = Account::loaded(key(1), 1, 0);
        let ops = vec![
            Operation::payment(key(2), Asset::Native, 10),
            Operation::change_trust(Asset::credit("USDC", key(9)).unwrap(), 1_000).with_source(key(2)),
        ];
        let tx = builder.build(&account, ops, 100, DEFAULT_TIMEOUT).unwrap();
        let signers: Vec<_> = tx.required_signers().iter().copied().collect();
        assert_eq!(signers.len(), 2);
        assert!(signers.contains(&key(1)));
        assert!(signers.contains(&key(2)));
    }

    #[test]
    fn test_fee_overflow() {
        let (builder, _) = builder_at(0);
        let account = Account::loaded(key(1), 1, 0);
        let ops = vec![Operation::bump_sequence(0), Operation::bump_sequence(0)];
        assert!(matches!(
            builder.build(&account, ops, u32::MAX, DEFAULT_TIMEOUT),
            Err(TxError::FeeOverflow { .. })
        ));
    }
}
