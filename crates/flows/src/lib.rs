//! Flow orchestration for questline.
//!
//! A flow is a fixed, ordered list of ledger transactions where each step
//! may depend on what the previous one produced: a new sequence number, a
//! claimable balance id, a liquidity pool id. This crate runs such flows
//! against any [`LedgerClient`](questline_client::LedgerClient).
//!
//! # Key Components
//!
//! - [`Flow`]: the trait every named flow implements.
//! - [`FlowOrchestrator`]: loads, builds, signs and submits each step,
//!   serializing steps per source account.
//! - [`StepLog`]: the ordered record of completed steps, returned on
//!   success in a [`FlowReport`] and on failure in a [`PartialFlowFailure`].
//! - [`RetryPolicy`]: how transport failures are resolved by hash and
//!   resubmitted.
//! - [`flows`]: the named flows themselves.
//!
//! # Example
//!
//! ```ignore
//! use questline_flows::{flows::SponsoredAccountCreation, FlowConfig, FlowOrchestrator};
//!
//! let orchestrator = FlowOrchestrator::new(ledger, network_id, clock, FlowConfig::default());
//! let report = orchestrator
//!     .run(&SponsoredAccountCreation { sponsor, new_account })
//!     .await?;
//! for step in &report.steps {
//!     println!("{}", step);
//! }
//! ```
//!
//! # Failure
//!
//! The first failed step ends the flow. Earlier steps are not undone; the
//! ledger offers no way to do so. Flows are therefore ordered so that any
//! completed prefix leaves accounts in a usable state.

mod config;
mod error;
pub mod flows;
mod log;
mod orchestrator;

pub use config::{FlowConfig, RetryPolicy};
pub use error::{FlowError, PartialFlowFailure, Result};
pub use log::{DerivedId, FlowReport, StepLog, StepRecord, StepSummary};
pub use orchestrator::{AccountGuard, AccountLocks, Flow, FlowOrchestrator, FlowRun, Step};
