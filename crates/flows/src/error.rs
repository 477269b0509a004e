//! Error types for flow execution.

use questline_client::LedgerError;
use questline_tx::TxError;
use thiserror::Error;

use crate::log::StepLog;

/// Why a single step, or the flow driving it, stopped.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// Construction or ledger failure, already classified.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The flow was cancelled between steps.
    #[error("flow cancelled")]
    Cancelled,
}

impl FlowError {
    /// A local validation failure, raised before anything is submitted.
    pub fn validation(message: impl Into<String>) -> Self {
        FlowError::Ledger(LedgerError::Validation(message.into()))
    }

    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            FlowError::Ledger(e) => Some(e),
            FlowError::Cancelled => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Ledger(e) => e.kind(),
            FlowError::Cancelled => "cancelled",
        }
    }
}

impl From<TxError> for FlowError {
    fn from(e: TxError) -> Self {
        FlowError::Ledger(LedgerError::from(e))
    }
}

/// A flow stopped at a failed step.
///
/// Steps that completed before the failure stay applied on the ledger;
/// `completed` lists them in order.
#[derive(Debug, Error)]
#[error("flow {flow} failed after {} completed step(s): {error}", completed.len())]
pub struct PartialFlowFailure {
    pub flow: String,
    pub completed: StepLog,
    #[source]
    pub error: FlowError,
}

impl PartialFlowFailure {
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        self.error.ledger_error()
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
