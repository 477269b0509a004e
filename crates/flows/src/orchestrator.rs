//! The flow orchestrator.
//!
//! A flow is an ordered list of steps. Each step loads its source account,
//! builds one transaction against the freshly loaded sequence number, signs
//! it and submits it. Steps run strictly one after another; the first
//! failure stops the flow and the caller gets back every step that
//! completed before it.
//!
//! # Sequence numbers
//!
//! Two steps submitted concurrently from the same source would race for the
//! same sequence number and one would fail with a sequence conflict. The
//! orchestrator serializes load→build→submit per source account with
//! [`AccountLocks`], so independent flows may share one orchestrator and run
//! concurrently. Accounts that are never a transaction source are not
//! locked.
//!
//! # Unknown outcomes
//!
//! A transport failure during submission leaves the outcome unknown: the
//! ledger may or may not have applied the envelope. The orchestrator never
//! rebuilds in that case. It asks the ledger for the transaction by hash
//! and:
//!
//! - records the step if the ledger applied it;
//! - surfaces the decoded error if the ledger included it as failed;
//! - resubmits the identical signed envelope after a backoff if the ledger
//!   has never seen it, up to [`RetryPolicy::max_attempts`].
//!
//! [`RetryPolicy::max_attempts`]: crate::RetryPolicy::max_attempts

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use questline_client::{
    Funder, LedgerClient, LedgerError, SubmitResponse, TransactionStatus,
};
use questline_common::{Clock, Hash256, NetworkId};
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::{
    fee_bump, Account, ChangeTrustLine, ClaimableBalanceId, Operation, OperationBody,
    SignedTransaction, SigningCoordinator, TransactionBuilder,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::error::{FlowError, PartialFlowFailure, Result};
use crate::log::{DerivedId, FlowReport, StepLog, StepRecord};

// ============================================================================
// Flow and Step
// ============================================================================

/// A named composite flow.
///
/// Implementations describe their steps by calling [`FlowRun::submit`] (or
/// [`FlowRun::submit_fee_bump`]) in order, feeding data returned by one
/// step into the construction of the next.
#[async_trait]
pub trait Flow: Send + Sync {
    /// Whatever the flow hands back on success, such as a derived id.
    type Output: Send;

    fn name(&self) -> &str;

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<Self::Output>;
}

/// One transaction to build, sign and submit.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    /// Account whose sequence number the transaction consumes.
    pub source: PublicKey,
    pub operations: Vec<Operation>,
    /// Keys to sign with. Order does not matter.
    pub signers: Vec<SecretKey>,
}

impl Step {
    /// A step sourced from, and signed by, `source`.
    pub fn new(name: impl Into<String>, source: &SecretKey, operations: Vec<Operation>) -> Self {
        Self {
            name: name.into(),
            source: source.public_key(),
            operations,
            signers: vec![source.clone()],
        }
    }

    /// Adds a signing key, e.g. for an operation with its own source.
    pub fn cosigned_by(mut self, key: &SecretKey) -> Self {
        self.signers.push(key.clone());
        self
    }
}

// ============================================================================
// Per-account serialization
// ============================================================================

/// One async mutex per source account.
///
/// Entries exist only while some task holds or waits for the account, so
/// the map tracks the accounts in flight rather than every account seen.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<PublicKey, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive use of `account`'s sequence number.
    pub async fn lock(&self, account: PublicKey) -> AccountGuard<'_> {
        let mutex = self.locks.entry(account).or_default().clone();
        let guard = mutex.lock_owned().await;
        AccountGuard {
            locks: &self.locks,
            account,
            guard: Some(guard),
        }
    }

    /// Accounts currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive use of one account. Dropping the last holder removes the
/// account's entry.
#[derive(Debug)]
pub struct AccountGuard<'a> {
    locks: &'a DashMap<PublicKey, Arc<Mutex<()>>>,
    account: PublicKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        // Release first so our own clone no longer counts.
        self.guard.take();
        self.locks
            .remove_if(&self.account, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives flows against a ledger.
///
/// Configuration is fixed at construction. One orchestrator may run many
/// flows concurrently.
pub struct FlowOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    funder: Option<Arc<dyn Funder>>,
    builder: TransactionBuilder,
    signer: SigningCoordinator,
    config: FlowConfig,
    locks: AccountLocks,
    cancel: CancellationToken,
}

impl FlowOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        network: NetworkId,
        clock: Arc<dyn Clock>,
        config: FlowConfig,
    ) -> Self {
        Self {
            ledger,
            funder: None,
            builder: TransactionBuilder::new(clock).with_max_snapshot_age(config.max_snapshot_age),
            signer: SigningCoordinator::new(network),
            config,
            locks: AccountLocks::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Provisions accounts through `funder` in [`FlowOrchestrator::fund`].
    pub fn with_funder(mut self, funder: Arc<dyn Funder>) -> Self {
        self.funder = Some(funder);
        self
    }

    /// Stops flows between steps, and during retry backoff, once `token`
    /// is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.builder.clock()
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn network_id(&self) -> &NetworkId {
        self.signer.network_id()
    }

    /// Funds test accounts. Failures are logged and returned per account;
    /// they never abort anything.
    pub async fn fund(&self, accounts: &[PublicKey]) -> Vec<(PublicKey, std::result::Result<(), LedgerError>)> {
        match &self.funder {
            Some(funder) => funder.fund_all(accounts).await,
            None => {
                warn!(count = accounts.len(), "No funder configured, skipping funding");
                Vec::new()
            }
        }
    }

    /// Runs `flow` to completion or to its first failed step.
    pub async fn run<F: Flow + ?Sized>(
        &self,
        flow: &F,
    ) -> std::result::Result<FlowReport<F::Output>, PartialFlowFailure> {
        let name = flow.name().to_string();
        info!(flow = %name, "Starting flow");
        let mut run = FlowRun {
            orchestrator: self,
            log: StepLog::new(),
        };
        match flow.execute(&mut run).await {
            Ok(output) => {
                info!(flow = %name, steps = run.log.len(), "Flow completed");
                Ok(FlowReport {
                    flow: name,
                    output,
                    steps: run.log,
                })
            }
            Err(error) => {
                warn!(
                    flow = %name,
                    completed = run.log.len(),
                    kind = error.kind(),
                    error = %error,
                    "Flow failed"
                );
                Err(PartialFlowFailure {
                    flow: name,
                    completed: run.log,
                    error,
                })
            }
        }
    }

    /// Submits `signed`, resolving transport failures by hash.
    ///
    /// Returns the response and the number of submission attempts.
    async fn submit_resolving(&self, signed: &SignedTransaction) -> Result<(SubmitResponse, u32)> {
        let policy = self.config.retry;
        let hash = signed.hash();
        let mut attempt = 1;
        loop {
            let err = match self.ledger.submit(signed).await {
                Ok(response) => return Ok((response, attempt)),
                Err(err) => err,
            };

            // A resubmitted envelope that the ledger already applied looks
            // like a sequence conflict.
            let unknown_outcome = err.is_retryable()
                || (attempt > 1 && matches!(err, LedgerError::SequenceConflict(_)));
            if !unknown_outcome {
                return Err(err.into());
            }

            warn!(hash = %hash, attempt, error = %err, "Submission outcome unknown, checking status");
            match self.ledger.transaction_status(&hash).await {
                Ok(TransactionStatus::Success { ledger }) => {
                    info!(hash = %hash, ledger, "Transaction was applied despite the failure");
                    return Ok((SubmitResponse { hash, ledger }, attempt));
                }
                Ok(TransactionStatus::Failed(failure)) => return Err(failure.into()),
                Ok(TransactionStatus::NotFound) => {
                    debug!(hash = %hash, "Transaction not found on ledger");
                }
                Err(status_err) => {
                    debug!(hash = %hash, error = %status_err, "Status lookup failed");
                }
            }

            if !err.is_retryable() || attempt >= policy.max_attempts {
                return Err(err.into());
            }
            let delay = policy.backoff(attempt);
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(FlowError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
            debug!(hash = %hash, attempt, "Resubmitting identical envelope");
        }
    }
}

// ============================================================================
// Flow run
// ============================================================================

/// The state of one flow execution: the orchestrator it runs on and the
/// steps completed so far.
pub struct FlowRun<'a> {
    orchestrator: &'a FlowOrchestrator,
    log: StepLog,
}

impl<'a> FlowRun<'a> {
    pub fn log(&self) -> &StepLog {
        &self.log
    }

    pub fn config(&self) -> &FlowConfig {
        &self.orchestrator.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.orchestrator.clock()
    }

    /// Loads a fresh snapshot of `id`.
    pub async fn load_account(&self, id: &PublicKey) -> Result<Account> {
        Ok(self.orchestrator.ledger.load_account(id).await?)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.orchestrator.cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        Ok(())
    }

    /// Loads, builds, signs and submits `step` as a plain transaction.
    pub async fn submit(&mut self, step: Step) -> Result<StepRecord> {
        self.check_cancelled()?;
        let orch = self.orchestrator;
        let _guard = orch.locks.lock(step.source).await;

        let signed = self.sign_step(&step).await?;
        let (response, attempts) = orch.submit_resolving(&signed).await?;
        Ok(self.record(&step, &signed, None, response, attempts))
    }

    /// Signs `step` as an inner transaction, wraps it in a fee bump paid by
    /// `fee_source` and submits the outer envelope.
    ///
    /// The outer fee is the base fee for every inner operation plus one,
    /// raised to the inner fee if that is higher.
    pub async fn submit_fee_bump(&mut self, step: Step, fee_source: &SecretKey) -> Result<StepRecord> {
        self.check_cancelled()?;
        let orch = self.orchestrator;
        let _guard = orch.locks.lock(step.source).await;

        let inner = self.sign_step(&step).await?;
        let outer = fee_bump::wrap_at_base_fee(&fee_source.public_key(), orch.config.base_fee, &inner)?;
        let signed = orch.signer.sign_fee_bump(outer, &[fee_source])?;
        debug!(
            inner = %inner.hash(),
            outer = %signed.hash(),
            fee_source = %fee_source.public_key(),
            "Wrapped step in fee bump"
        );

        let (response, attempts) = orch.submit_resolving(&signed).await?;
        Ok(self.record(&step, &signed, Some(inner.hash()), response, attempts))
    }

    async fn sign_step(&self, step: &Step) -> Result<SignedTransaction> {
        let orch = self.orchestrator;
        let account = self.load_account(&step.source).await?;
        let unsigned = orch.builder.build(
            &account,
            step.operations.clone(),
            orch.config.base_fee,
            orch.config.tx_timeout,
        )?;
        let keys: Vec<&SecretKey> = step.signers.iter().collect();
        Ok(orch.signer.sign(unsigned, &keys)?)
    }

    fn record(
        &mut self,
        step: &Step,
        signed: &SignedTransaction,
        inner_hash: Option<Hash256>,
        response: SubmitResponse,
        attempts: u32,
    ) -> StepRecord {
        let sequence = signed.sequence();
        let record = StepRecord {
            index: self.log.next_index(),
            name: step.name.clone(),
            source: step.source,
            sequence,
            hash: response.hash,
            inner_hash,
            ledger: response.ledger,
            fee: signed.fee(),
            operations: step.operations.iter().map(Operation::kind).collect(),
            attempts,
            derived: derived_ids(&step.source, sequence, &step.operations),
        };
        info!(
            step = %record.name,
            hash = %record.hash,
            ledger = record.ledger,
            attempts,
            "Step completed"
        );
        self.log.push(record.clone());
        record
    }
}

/// Identifiers a successful transaction brings into existence.
fn derived_ids(source: &PublicKey, sequence: i64, operations: &[Operation]) -> Vec<DerivedId> {
    operations
        .iter()
        .enumerate()
        .filter_map(|(index, op)| match &op.body {
            OperationBody::CreateAccount { destination, .. } => Some(DerivedId::Account(*destination)),
            OperationBody::CreateClaimableBalance { .. } => {
                ClaimableBalanceId::derive(source, sequence, index as u32)
                    .ok()
                    .map(DerivedId::ClaimableBalance)
            }
            OperationBody::ChangeTrust {
                line: ChangeTrustLine::PoolShare(params),
                ..
            } => params.pool_id().ok().map(DerivedId::LiquidityPool),
            _ => None,
        })
        .collect()
}

impl StepRecord {
    pub fn claimable_balance_id(&self) -> Option<ClaimableBalanceId> {
        self.derived.iter().find_map(|d| match d {
            DerivedId::ClaimableBalance(id) => Some(*id),
            _ => None,
        })
    }

    pub fn created_account(&self) -> Option<PublicKey> {
        self.derived.iter().find_map(|d| match d {
            DerivedId::Account(id) => Some(*id),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_tx::{Asset, ClaimPredicate, Claimant, PoolParameters};

    fn key(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn test_derived_ids_follow_operation_index() {
        let source = key(1);
        let pool = PoolParameters::constant_product(
            Asset::Native,
            Asset::credit("USD", key(2)).unwrap(),
        )
        .unwrap();
        let ops = vec![
            Operation::bump_sequence(0),
            Operation::create_claimable_balance(
                Asset::Native,
                10,
                vec![Claimant::new(key(3), ClaimPredicate::Unconditional)],
            ),
            Operation::change_trust_pool(pool.clone(), i64::MAX),
            Operation::create_account(key(4), 1),
        ];

        let derived = derived_ids(&source, 77, &ops);
        assert_eq!(
            derived,
            vec![
                DerivedId::ClaimableBalance(ClaimableBalanceId::derive(&source, 77, 1).unwrap()),
                DerivedId::LiquidityPool(pool.pool_id().unwrap()),
                DerivedId::Account(key(4)),
            ]
        );
    }

    #[tokio::test]
    async fn test_account_locks_serialize_same_account() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.lock(key(1)).await;

        let other = locks.clone();
        let independent = tokio::spawn(async move {
            let _g = other.lock(key(2)).await;
        });
        independent.await.unwrap();

        let same = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = same.lock(key(1)).await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_account_locks_release_entries() {
        let locks = Arc::new(AccountLocks::new());
        let first = locks.lock(key(1)).await;
        assert_eq!(locks.len(), 1);

        let same = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = same.lock(key(1)).await;
        });
        tokio::task::yield_now().await;
        drop(first);
        // The waiter still holds the entry, so it survives the first release.
        waiter.await.unwrap();
        assert!(locks.is_empty());

        for seed in 1..=5 {
            let _g = locks.lock(key(seed)).await;
        }
        assert!(locks.is_empty());
    }
}
