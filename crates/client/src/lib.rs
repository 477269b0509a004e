//! Submission client for questline.
//!
//! This crate is the only place that talks to a ledger network. It defines
//! the [`LedgerClient`] boundary (load an account, submit a signed envelope,
//! look a transaction up by hash), a Horizon REST implementation of it, the
//! friendbot funding side-channel, and the [`LedgerError`] taxonomy that
//! every rejection is decoded into.
//!
//! The client never retries. A [`LedgerError::Network`] leaves the outcome
//! of a submission unknown; deciding whether to query status and resubmit
//! belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use questline_client::{HorizonClient, HorizonConfig, LedgerClient};
//!
//! let client = HorizonClient::new(HorizonConfig::testnet(), clock)?;
//! let account = client.load_account(&public_key).await?;
//! let response = client.submit(&signed).await?;
//! println!("{} in ledger {}", response.hash, response.ledger);
//! ```

pub mod codes;
mod error;
pub mod friendbot;
pub mod horizon;
mod ledger;

pub use error::{Diagnostics, LedgerError, Result};
pub use friendbot::{Funder, FriendbotFunder};
pub use horizon::{HorizonClient, HorizonConfig};
pub use ledger::{LedgerClient, SubmitResponse, TransactionStatus};
