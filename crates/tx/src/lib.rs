//! Transaction construction for questline.
//!
//! Everything in this crate is local and synchronous: it turns intent into
//! signed envelopes without touching the network.
//!
//! # Key Types
//!
//! - [`Account`]: a snapshot of an account's sequence number, signers and
//!   thresholds, stamped with when it was loaded.
//! - [`Operation`]: one typed variant per ledger operation family, each with
//!   an optional acting source.
//! - [`TransactionBuilder`]: assembles operations into an
//!   [`UnsignedTransaction`] consuming exactly one sequence number.
//! - [`SigningCoordinator`]: signs the network-bound hash and produces a
//!   [`SignedTransaction`].
//! - [`fee_bump`]: wraps a signed transaction so another account pays.
//! - [`SignatureChecker`]: weight accounting against an account's signers.
//!
//! # Workflow
//!
//! ```ignore
//! let builder = TransactionBuilder::new(clock);
//! let unsigned = builder.build(&account, vec![Operation::bump_sequence(n)], BASE_FEE, DEFAULT_TIMEOUT)?;
//! let signed = SigningCoordinator::new(network_id).sign(unsigned, &[&secret])?;
//! client.submit(&signed).await?;
//! ```
//!
//! # Identifiers
//!
//! Claimable balance ids ([`ClaimableBalanceId`]) and liquidity pool ids
//! ([`LiquidityPoolId`]) are pure functions of their inputs and can be
//! derived before, or without, submitting anything.

pub mod account;
pub mod asset;
pub mod builder;
pub mod claim;
mod error;
pub mod fee_bump;
pub mod frame;
pub mod operations;
pub mod pool;
pub mod signature_checker;
pub mod signing;

pub use account::{Account, Balance, BalanceLine, Signer, Thresholds};
pub use asset::{Asset, CreditAsset};
pub use builder::{
    TransactionBuilder, UnsignedTransaction, BASE_FEE, DEFAULT_MAX_SNAPSHOT_AGE, DEFAULT_TIMEOUT,
    MAX_OPERATIONS,
};
pub use claim::{ClaimPredicate, ClaimableBalanceId, Claimant};
pub use error::{OperationValidationError, TxError};
pub use frame::TransactionFrame;
pub use operations::{
    get_threshold_level, ChangeTrustLine, Operation, OperationBody, SetOptions, SignerChange,
    ThresholdLevel,
};
pub use pool::{LiquidityPoolId, PoolParameters, POOL_FEE_BPS};
pub use signature_checker::SignatureChecker;
pub use signing::{SignedTransaction, SigningCoordinator};

/// Result type for transaction construction.
pub type Result<T> = std::result::Result<T, TxError>;
