//! The sandbox ledger: a [`LedgerClient`] and [`Funder`] backed by an
//! in-memory [`LedgerState`].
//!
//! Every submission that passes validation closes one ledger at the
//! clock's current time. Rejected envelopes close nothing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use questline_client::{
    codes, Diagnostics, Funder, LedgerClient, LedgerError, Result, SubmitResponse, TransactionStatus,
};
use questline_common::{Clock, Hash256, NetworkId, STROOPS_PER_UNIT};
use questline_crypto::PublicKey;
use questline_tx::{Account, Asset, BalanceLine, ClaimableBalanceId, LiquidityPoolId, SignedTransaction};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::apply::{apply_transaction, LedgerHeader, TxOutcome};
use crate::state::{
    line_of, AccountEntry, ClaimableBalanceEntry, LedgerState, OfferEntry, PoolEntry,
    TrustLineEntry,
};

/// Balance given to accounts created through [`Funder::fund`].
pub const FRIENDBOT_AMOUNT: i64 = 10_000 * STROOPS_PER_UNIT;

/// A transport failure to simulate on an upcoming submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The submission never reaches the ledger.
    DropRequest,
    /// The ledger applies the submission but the response is lost.
    DropResponse,
}

#[derive(Debug, Clone)]
struct TxRecord {
    ledger: u32,
    result: std::result::Result<(), Diagnostics>,
}

struct Inner {
    state: LedgerState,
    ledger_seq: u32,
    close_time: u64,
    records: HashMap<Hash256, TxRecord>,
    faults: VecDeque<Fault>,
}

/// In-memory ledger with the submission semantics of a real network.
pub struct SandboxLedger {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    network: NetworkId,
}

/// Builds the Horizon-shaped `extras` payload for a result.
fn with_result_codes(diagnostics: Diagnostics) -> Diagnostics {
    let mut codes = json!({ "transaction": diagnostics.transaction });
    if let Some(inner) = &diagnostics.inner_transaction {
        codes["inner_transaction"] = json!(inner);
    }
    if !diagnostics.operations.is_empty() {
        codes["operations"] = json!(diagnostics.operations);
    }
    let extras = json!({ "result_codes": codes });
    diagnostics.with_extras(extras)
}

impl SandboxLedger {
    pub fn new(network: NetworkId, clock: Arc<dyn Clock>) -> Self {
        let close_time = clock.now_unix();
        Self {
            inner: Mutex::new(Inner {
                state: LedgerState::default(),
                ledger_seq: 1,
                close_time,
                records: HashMap::new(),
                faults: VecDeque::new(),
            }),
            clock,
            network,
        }
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network
    }

    /// Creates an account directly, without a transaction.
    pub fn create_account(&self, id: PublicKey, balance: i64) {
        let mut inner = self.inner.lock();
        let seq_num = (inner.ledger_seq as i64) << 32;
        inner.state.insert_account(AccountEntry::new(id, balance, seq_num));
    }

    /// Queues a fault for the next submission.
    pub fn inject_fault(&self, fault: Fault) {
        self.inner.lock().faults.push_back(fault);
    }

    /// Sequence of the last closed ledger.
    pub fn ledger_seq(&self) -> u32 {
        self.inner.lock().ledger_seq
    }

    /// Close time of the last closed ledger.
    pub fn close_time(&self) -> u64 {
        self.inner.lock().close_time
    }

    /// Runs `f` against the committed state.
    pub fn with_state<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn account(&self, id: &PublicKey) -> Option<AccountEntry> {
        self.with_state(|s| s.account(id).cloned())
    }

    pub fn trustline(&self, holder: &PublicKey, asset: &Asset) -> Option<TrustLineEntry> {
        self.with_state(|s| s.trustline(holder, &line_of(asset)).cloned())
    }

    /// Pool shares held by `holder`, if it trusts the pool.
    pub fn pool_shares(&self, holder: &PublicKey, pool: &LiquidityPoolId) -> Option<i64> {
        self.with_state(|s| {
            s.trustline(holder, &BalanceLine::PoolShare(*pool))
                .map(|t| t.balance)
        })
    }

    pub fn pool(&self, id: &LiquidityPoolId) -> Option<PoolEntry> {
        self.with_state(|s| s.pool(id).cloned())
    }

    pub fn claimable_balance(&self, id: &ClaimableBalanceId) -> Option<ClaimableBalanceEntry> {
        self.with_state(|s| s.claimable_balance(id).cloned())
    }

    pub fn offers_by(&self, seller: &PublicKey) -> Vec<OfferEntry> {
        self.with_state(|s| s.offers_by(seller).cloned().collect())
    }

    pub fn data(&self, id: &PublicKey, name: &str) -> Option<Vec<u8>> {
        self.with_state(|s| s.account(id).and_then(|a| a.data.get(name).cloned()))
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    async fn load_account(&self, id: &PublicKey) -> Result<Account> {
        let now = self.clock.now_unix();
        self.with_state(|s| s.snapshot(id, now))
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        let mut inner = self.inner.lock();
        let fault = inner.faults.pop_front();
        if fault == Some(Fault::DropRequest) {
            warn!(hash = %tx.hash(), "Dropping submission before it reaches the ledger");
            return Err(LedgerError::Network("connection reset before request was sent".into()));
        }

        let frame = tx.frame();
        let header = LedgerHeader {
            ledger_seq: inner.ledger_seq + 1,
            close_time: self.clock.now_unix(),
            network: self.network,
        };
        let outcome = apply_transaction(&mut inner.state, &frame, &header);

        let response = match outcome {
            TxOutcome::Rejected(diagnostics) => {
                debug!(hash = %tx.hash(), %diagnostics, "Transaction rejected");
                Err(LedgerError::classify(with_result_codes(diagnostics)))
            }
            TxOutcome::Included(result) => {
                let result = result.map_err(with_result_codes);
                inner.ledger_seq = header.ledger_seq;
                inner.close_time = header.close_time;
                let record = TxRecord {
                    ledger: header.ledger_seq,
                    result: result.clone(),
                };
                inner.records.insert(tx.hash(), record.clone());
                if frame.is_fee_bump() {
                    if let Ok(inner_hash) = frame.inner_hash(&self.network) {
                        inner.records.insert(inner_hash, record);
                    }
                }
                match result {
                    Ok(()) => {
                        info!(hash = %tx.hash(), ledger = header.ledger_seq, "Transaction applied");
                        Ok(SubmitResponse {
                            hash: tx.hash(),
                            ledger: header.ledger_seq,
                        })
                    }
                    Err(diagnostics) => {
                        info!(hash = %tx.hash(), ledger = header.ledger_seq, %diagnostics, "Transaction failed");
                        Err(LedgerError::classify(diagnostics))
                    }
                }
            }
        };

        if fault == Some(Fault::DropResponse) {
            warn!(hash = %tx.hash(), "Dropping response after the ledger processed the submission");
            return Err(LedgerError::Network("connection reset while awaiting response".into()));
        }
        response
    }

    async fn transaction_status(&self, hash: &Hash256) -> Result<TransactionStatus> {
        let inner = self.inner.lock();
        Ok(match inner.records.get(hash) {
            None => TransactionStatus::NotFound,
            Some(TxRecord { ledger, result: Ok(()) }) => TransactionStatus::Success { ledger: *ledger },
            Some(TxRecord { result: Err(d), .. }) => TransactionStatus::Failed(LedgerError::classify(d.clone())),
        })
    }
}

#[async_trait]
impl Funder for SandboxLedger {
    async fn fund(&self, account: &PublicKey) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.account(account).is_some() {
            let diagnostics = with_result_codes(Diagnostics::operations(&[codes::OP_ALREADY_EXISTS]));
            return Err(LedgerError::Rejected(diagnostics));
        }
        inner.ledger_seq += 1;
        inner.close_time = self.clock.now_unix();
        let seq_num = (inner.ledger_seq as i64) << 32;
        inner
            .state
            .insert_account(AccountEntry::new(*account, FRIENDBOT_AMOUNT, seq_num));
        info!(account = %account, "Funded account");
        Ok(())
    }
}
