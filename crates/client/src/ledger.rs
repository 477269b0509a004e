//! The ledger network boundary.

use async_trait::async_trait;
use questline_common::Hash256;
use questline_crypto::PublicKey;
use questline_tx::{Account, SignedTransaction};

use crate::error::{LedgerError, Result};

/// What the ledger returns for an accepted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitResponse {
    /// Hash of the submitted envelope (the outer hash for fee bumps).
    pub hash: Hash256,
    /// Ledger sequence the transaction was included in.
    pub ledger: u32,
}

/// Outcome of looking a transaction up by hash.
#[derive(Debug, Clone)]
pub enum TransactionStatus {
    Success { ledger: u32 },
    Failed(LedgerError),
    NotFound,
}

/// Request/response access to a ledger network.
///
/// Implementations perform exactly one round trip per call and never retry.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Loads a fresh account snapshot, stamped with the load time.
    async fn load_account(&self, id: &PublicKey) -> Result<Account>;

    /// Submits a signed envelope.
    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResponse>;

    /// Looks up a previously submitted transaction.
    async fn transaction_status(&self, hash: &Hash256) -> Result<TransactionStatus>;
}
