//! Error types for transaction construction.
//!
//! Everything in this crate runs before any network call, so every failure
//! here is a local validation failure: the input was malformed and would be
//! rejected by the ledger unchanged.

use thiserror::Error;

/// Errors raised while building, signing or wrapping transactions.
#[derive(Debug, Error)]
pub enum TxError {
    /// An operation failed its structural checks.
    #[error("operation {index} ({kind}) is malformed: {source}")]
    InvalidOperation {
        index: usize,
        kind: &'static str,
        #[source]
        source: OperationValidationError,
    },

    /// A transaction needs at least one operation.
    #[error("transaction has no operations")]
    NoOperations,

    /// More operations than a single transaction may carry.
    #[error("transaction has {0} operations, at most 100 are allowed")]
    TooManyOperations(usize),

    /// The account snapshot was not loaded from the ledger, or is too old to
    /// trust its sequence number.
    #[error("account snapshot for {account} is stale: {reason}")]
    StaleAccount { account: String, reason: String },

    /// Fee arithmetic overflowed the wire type.
    #[error("fee overflow: {per_op} x {ops} operations")]
    FeeOverflow { per_op: u32, ops: usize },

    /// Fee bump outer fee below the minimum the ledger accepts.
    #[error("fee bump outer fee {outer_fee} is less than required minimum {required_min}")]
    InsufficientOuterFee { outer_fee: i64, required_min: i64 },

    /// Inner transaction of a fee bump is unusable.
    #[error("invalid fee bump inner transaction: {0}")]
    InvalidInner(String),

    /// Envelope cannot carry more signatures.
    #[error("too many signatures: {0} (max 20)")]
    TooManySignatures(usize),

    /// Generic validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] questline_crypto::CryptoError),

    /// Shared-type error (amounts, prices, asset codes).
    #[error(transparent)]
    Common(#[from] questline_common::Error),

    /// XDR error.
    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),
}

/// Structural problems with a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationValidationError {
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid data entry: {0}")]
    InvalidData(String),

    #[error("invalid claimant: {0}")]
    InvalidClaimant(String),

    #[error("invalid flags: {0}")]
    InvalidFlags(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid home domain: {0}")]
    InvalidHomeDomain(String),

    #[error("{0}")]
    Other(String),
}
