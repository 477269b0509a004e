//! Ledger error taxonomy.
//!
//! Every failure that crosses the ledger boundary is one [`LedgerError`].
//! Rejections decoded from the ledger's result codes carry the codes and the
//! raw diagnostic payload in [`Diagnostics`] so operators can see exactly
//! what the ledger said. Only [`LedgerError::Network`] may be retried; every
//! other kind is deterministic and fails the same way if resubmitted
//! unchanged.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::codes;

/// Result codes and raw payload attached to a ledger rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Transaction-level code, e.g. `tx_bad_seq`.
    pub transaction: Option<String>,
    /// Inner transaction code when a fee bump's inner transaction failed.
    pub inner_transaction: Option<String>,
    /// One code per operation, e.g. `["op_success", "op_underfunded"]`.
    pub operations: Vec<String>,
    /// The ledger's raw diagnostic payload, verbatim.
    pub extras: serde_json::Value,
}

impl Diagnostics {
    pub fn transaction(code: &str) -> Self {
        Self {
            transaction: Some(code.to_string()),
            ..Default::default()
        }
    }

    /// A `tx_failed` with the given operation codes.
    pub fn operations(ops: &[&str]) -> Self {
        Self {
            transaction: Some(codes::TX_FAILED.to_string()),
            operations: ops.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_inner(mut self, code: &str) -> Self {
        self.inner_transaction = Some(code.to_string());
        self
    }

    pub fn with_extras(mut self, extras: serde_json::Value) -> Self {
        self.extras = extras;
        self
    }

    /// Reads `result_codes` out of a Horizon problem `extras` object and
    /// keeps the whole object as the raw payload.
    pub fn from_extras(extras: serde_json::Value) -> Self {
        let codes = extras.get("result_codes");
        let text = |key: &str| {
            codes
                .and_then(|c| c.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let operations = codes
            .and_then(|c| c.get("operations"))
            .and_then(|v| v.as_array())
            .map(|ops| {
                ops.iter()
                    .filter_map(|o| o.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            transaction: text("transaction"),
            inner_transaction: text("inner_transaction"),
            operations,
            extras,
        }
    }

    /// The transaction code that describes the failure: the inner code for
    /// a failed fee bump, the outer code otherwise.
    pub fn effective_transaction_code(&self) -> Option<&str> {
        match self.transaction.as_deref() {
            Some(codes::TX_FEE_BUMP_INNER_FAILED) => self
                .inner_transaction
                .as_deref()
                .or(Some(codes::TX_FEE_BUMP_INNER_FAILED)),
            other => other,
        }
    }

    /// First operation code that is not a success.
    pub fn failing_operation(&self) -> Option<(usize, &str)> {
        self.operations
            .iter()
            .enumerate()
            .find(|(_, code)| code.as_str() != codes::OP_SUCCESS)
            .map(|(i, code)| (i, code.as_str()))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.transaction.as_deref().unwrap_or("unknown"))?;
        if let Some(inner) = &self.inner_transaction {
            write!(f, " (inner {})", inner)?;
        }
        if !self.operations.is_empty() {
            write!(f, " [{}]", self.operations.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Malformed input caught before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The transaction's sequence number is not the account's next one.
    #[error("sequence conflict: {0}")]
    SequenceConflict(Diagnostics),

    /// Signatures do not reach the needed threshold.
    #[error("insufficient signer weight: {0}")]
    InsufficientWeight(Diagnostics),

    #[error("insufficient fee: {0}")]
    InsufficientFee(Diagnostics),

    /// Not enough balance or reserve for the operation.
    #[error("insufficient balance: {0}")]
    InsufficientBalance(Diagnostics),

    /// Missing or unauthorized trustline, or a claim whose predicate does
    /// not hold.
    #[error("unauthorized trustline: {0}")]
    UnauthorizedTrustline(Diagnostics),

    /// Outside the transaction's time bounds.
    #[error("transaction expired: {0}")]
    Expired(Diagnostics),

    /// Any other deterministic ledger rejection.
    #[error("rejected by ledger: {0}")]
    Rejected(Diagnostics),

    /// Transport failure; the submission outcome is unknown.
    #[error("network error: {0}")]
    Network(String),

    /// The ledger answered with an unexpected payload.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),
}

impl LedgerError {
    /// Decodes ledger result codes into a taxonomy kind.
    pub fn classify(diagnostics: Diagnostics) -> Self {
        let tx_code = diagnostics.effective_transaction_code().map(str::to_string);
        match tx_code.as_deref() {
            Some(codes::TX_BAD_SEQ) => LedgerError::SequenceConflict(diagnostics),
            Some(codes::TX_BAD_AUTH) | Some(codes::TX_BAD_AUTH_EXTRA) => {
                LedgerError::InsufficientWeight(diagnostics)
            }
            Some(codes::TX_INSUFFICIENT_FEE) => LedgerError::InsufficientFee(diagnostics),
            Some(codes::TX_INSUFFICIENT_BALANCE) => LedgerError::InsufficientBalance(diagnostics),
            Some(codes::TX_TOO_EARLY) | Some(codes::TX_TOO_LATE) => {
                LedgerError::Expired(diagnostics)
            }
            Some(codes::TX_FAILED) => {
                let op_code = diagnostics.failing_operation().map(|(_, c)| c.to_string());
                match op_code.as_deref() {
                    Some(codes::OP_BAD_AUTH) => LedgerError::InsufficientWeight(diagnostics),
                    Some(code) if codes::is_balance_failure(code) => {
                        LedgerError::InsufficientBalance(diagnostics)
                    }
                    Some(code) if codes::is_authorization_failure(code) => {
                        LedgerError::UnauthorizedTrustline(diagnostics)
                    }
                    _ => LedgerError::Rejected(diagnostics),
                }
            }
            _ => LedgerError::Rejected(diagnostics),
        }
    }

    /// True only for transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Network(_))
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            LedgerError::SequenceConflict(d)
            | LedgerError::InsufficientWeight(d)
            | LedgerError::InsufficientFee(d)
            | LedgerError::InsufficientBalance(d)
            | LedgerError::UnauthorizedTrustline(d)
            | LedgerError::Expired(d)
            | LedgerError::Rejected(d) => Some(d),
            _ => None,
        }
    }

    /// Short name of the taxonomy kind, for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::SequenceConflict(_) => "sequence_conflict",
            LedgerError::InsufficientWeight(_) => "insufficient_weight",
            LedgerError::InsufficientFee(_) => "insufficient_fee",
            LedgerError::InsufficientBalance(_) => "insufficient_balance",
            LedgerError::UnauthorizedTrustline(_) => "unauthorized_trustline",
            LedgerError::Expired(_) => "expired",
            LedgerError::Rejected(_) => "rejected",
            LedgerError::Network(_) => "network",
            LedgerError::MalformedResponse(_) => "malformed_response",
            LedgerError::AccountNotFound(_) => "account_not_found",
        }
    }
}

impl From<questline_tx::TxError> for LedgerError {
    fn from(e: questline_tx::TxError) -> Self {
        LedgerError::Validation(e.to_string())
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LedgerError::MalformedResponse(e.to_string())
        } else {
            LedgerError::Network(e.to_string())
        }
    }
}

/// Result type for ledger calls.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_codes() {
        assert!(matches!(
            LedgerError::classify(Diagnostics::transaction("tx_bad_seq")),
            LedgerError::SequenceConflict(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::transaction("tx_bad_auth")),
            LedgerError::InsufficientWeight(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::transaction("tx_insufficient_fee")),
            LedgerError::InsufficientFee(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::transaction("tx_too_late")),
            LedgerError::Expired(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::transaction("tx_no_source_account")),
            LedgerError::Rejected(_)
        ));
    }

    #[test]
    fn test_operation_codes() {
        assert!(matches!(
            LedgerError::classify(Diagnostics::operations(&["op_success", "op_underfunded"])),
            LedgerError::InsufficientBalance(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::operations(&["op_cannot_claim"])),
            LedgerError::UnauthorizedTrustline(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::operations(&["op_not_clawback_enabled"])),
            LedgerError::UnauthorizedTrustline(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::operations(&["op_bad_auth"])),
            LedgerError::InsufficientWeight(_)
        ));
        assert!(matches!(
            LedgerError::classify(Diagnostics::operations(&["op_malformed"])),
            LedgerError::Rejected(_)
        ));
    }

    #[test]
    fn test_fee_bump_uses_inner_code() {
        let d = Diagnostics::transaction("tx_fee_bump_inner_failed").with_inner("tx_bad_seq");
        assert!(matches!(LedgerError::classify(d), LedgerError::SequenceConflict(_)));
    }

    #[test]
    fn test_from_extras_keeps_payload() {
        let extras = json!({
            "envelope_xdr": "AAAA",
            "result_codes": {
                "transaction": "tx_failed",
                "operations": ["op_success", "op_no_trust"]
            }
        });
        let d = Diagnostics::from_extras(extras.clone());
        assert_eq!(d.transaction.as_deref(), Some("tx_failed"));
        assert_eq!(d.failing_operation(), Some((1, "op_no_trust")));
        assert_eq!(d.extras, extras);

        let err = LedgerError::classify(d);
        assert_eq!(err.kind(), "unauthorized_trustline");
        assert!(!err.is_retryable());
        assert_eq!(err.diagnostics().unwrap().extras, extras);
    }

    #[test]
    fn test_only_network_is_retryable() {
        assert!(LedgerError::Network("reset".into()).is_retryable());
        assert!(!LedgerError::MalformedResponse("x".into()).is_retryable());
        assert!(!LedgerError::Validation("x".into()).is_retryable());
    }
}
