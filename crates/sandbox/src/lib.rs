//! In-memory ledger for questline.
//!
//! [`SandboxLedger`] implements [`LedgerClient`](questline_client::LedgerClient)
//! and [`Funder`](questline_client::Funder) without any network. It validates
//! envelopes the way a validator does (time bounds, sequence numbers, fees,
//! signature weights) and applies the operation families the flows use:
//!
//! - account creation, merge, options, data entries and sequence bumps
//! - payments and path payments routed through liquidity pools
//! - trustlines, authorization flags and clawback
//! - claimable balances with time predicates
//! - sponsorship sandwiches
//! - liquidity pool deposits and withdrawals
//! - offers, which are recorded but never matched
//!
//! Ledger close time is read from the [`Clock`](questline_common::Clock)
//! handed to [`SandboxLedger::new`], so tests drive time with a
//! [`ManualClock`](questline_common::ManualClock).
//!
//! [`Fault`] injection simulates a request or a response lost in transit,
//! which is how retry and status-by-hash resolution are exercised.

mod apply;
mod execute;
mod ledger;
pub mod state;

pub use ledger::{Fault, SandboxLedger, FRIENDBOT_AMOUNT};
pub use state::{
    AccountEntry, ClaimableBalanceEntry, LedgerState, OfferEntry, PoolEntry, TrustLineEntry,
    BASE_RESERVE, LEDGER_BASE_FEE,
};
