//! Common types and utilities for questline.
//!
//! This crate provides the small set of shared values every other crate
//! needs: the [`Hash256`] digest type, network identity ([`NetworkId`],
//! [`NetworkContext`]), the [`Clock`] abstraction used to stamp transaction
//! time bounds, and exact amount/price arithmetic.

pub mod asset;
pub mod error;
pub mod math;
pub mod network;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use math::{format_amount, parse_amount, Price, STROOPS_PER_UNIT};
pub use network::{NetworkContext, NetworkId};
pub use time::{Clock, ManualClock, SystemClock};
pub use types::Hash256;

/// Re-export stellar-xdr for convenience
pub use stellar_xdr;
