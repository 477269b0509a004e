//! Orchestrator settings.

use std::time::Duration;

use questline_tx::{BASE_FEE, DEFAULT_MAX_SNAPSHOT_AGE, DEFAULT_TIMEOUT};

/// Resubmission schedule for steps whose outcome is unknown after a
/// transport failure.
///
/// The delay before attempt `n` (1-indexed, `n >= 2`) is
/// `initial_backoff * 2^(n-2)`, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submission attempts per step, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Never resubmit.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

/// Settings shared by every step the orchestrator submits.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Fee per operation, in stroops.
    pub base_fee: u32,
    /// Ledger-side validity window of each transaction.
    pub tx_timeout: Duration,
    /// Oldest account snapshot the builder accepts.
    pub max_snapshot_age: Duration,
    pub retry: RetryPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_fee: BASE_FEE,
            tx_timeout: DEFAULT_TIMEOUT,
            max_snapshot_age: DEFAULT_MAX_SNAPSHOT_AGE,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(30), Duration::from_millis(350));
    }

    #[test]
    fn test_none_means_single_attempt() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
