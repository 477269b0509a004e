//! The step log: an ordered, append-only record of submitted steps.

use std::fmt;

use questline_common::Hash256;
use questline_crypto::PublicKey;
use questline_tx::{ClaimableBalanceId, LiquidityPoolId};
use serde::Serialize;

/// An identifier a step brought into existence, for later steps to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedId {
    Account(PublicKey),
    ClaimableBalance(ClaimableBalanceId),
    LiquidityPool(LiquidityPoolId),
}

impl fmt::Display for DerivedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedId::Account(id) => write!(f, "account {}", id),
            DerivedId::ClaimableBalance(id) => write!(f, "claimable balance {}", id),
            DerivedId::LiquidityPool(id) => write!(f, "liquidity pool {}", id.to_hex()),
        }
    }
}

/// One submitted and accepted transaction.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Position in the flow, starting at 0.
    pub index: usize,
    pub name: String,
    /// Account whose sequence number the step consumed.
    pub source: PublicKey,
    pub sequence: i64,
    /// Hash reported by the ledger: the outer hash for a fee bump.
    pub hash: Hash256,
    /// Hash of the wrapped transaction, for fee-bump steps.
    pub inner_hash: Option<Hash256>,
    pub ledger: u32,
    pub fee: i64,
    /// Operation kinds, in order.
    pub operations: Vec<&'static str>,
    /// Submission attempts, including resubmissions after transport errors.
    pub attempts: u32,
    pub derived: Vec<DerivedId>,
}

impl StepRecord {
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            index: self.index,
            name: self.name.clone(),
            source: self.source.to_string(),
            sequence: self.sequence,
            hash: self.hash.to_hex(),
            inner_hash: self.inner_hash.map(|h| h.to_hex()),
            ledger: self.ledger,
            fee: self.fee,
            operations: self.operations.clone(),
            attempts: self.attempts,
            derived: self.derived.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] ledger={} hash={}",
            self.index,
            self.name,
            self.operations.join(","),
            self.ledger,
            self.hash
        )
    }
}

/// Serializable view of a [`StepRecord`] for reports.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub index: usize,
    pub name: String,
    pub source: String,
    pub sequence: i64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_hash: Option<String>,
    pub ledger: u32,
    pub fee: i64,
    pub operations: Vec<&'static str>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<String>,
}

/// Append-only log of the steps a flow has completed.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Vec<StepRecord>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    /// Index the next recorded step will get.
    pub fn next_index(&self) -> usize {
        self.steps.len()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepRecord> {
        self.steps.iter()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    pub fn get(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn summaries(&self) -> Vec<StepSummary> {
        self.steps.iter().map(StepRecord::summary).collect()
    }
}

impl<'a> IntoIterator for &'a StepLog {
    type Item = &'a StepRecord;
    type IntoIter = std::slice::Iter<'a, StepRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// A flow that ran to completion.
#[derive(Debug, Clone)]
pub struct FlowReport<T> {
    pub flow: String,
    pub output: T,
    pub steps: StepLog,
}
