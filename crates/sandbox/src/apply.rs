//! Transaction validation and application.
//!
//! Validity failures (time bounds, sequence, fee, signatures) reject the
//! envelope outright: nothing is charged and the sequence number is not
//! consumed. A valid transaction always charges its fee and consumes its
//! sequence number; if any operation fails, every operation's effects are
//! discarded and the transaction is recorded as failed.

use questline_client::{codes, Diagnostics};
use questline_common::{Hash256, NetworkId};
use questline_crypto::PublicKey;
use questline_tx::fee_bump::minimum_outer_fee;
use questline_tx::operations::ThresholdLevel;
use questline_tx::signature_checker::account_signers;
use questline_tx::{get_threshold_level, SignatureChecker, Signer, TransactionFrame};
use stellar_xdr::curr::DecoratedSignature;
use tracing::{debug, trace};

use crate::execute::{execute, muxed_key, OpContext};
use crate::state::{LedgerState, LEDGER_BASE_FEE};

/// What happened to a submitted envelope.
#[derive(Debug, Clone)]
pub(crate) enum TxOutcome {
    /// Not valid; the ledger never included it.
    Rejected(Diagnostics),
    /// Included in a ledger, successfully or not.
    Included(Result<(), Diagnostics>),
}

/// Ledger header values for the ledger being closed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LedgerHeader {
    pub ledger_seq: u32,
    pub close_time: u64,
    pub network: NetworkId,
}

struct InnerTx<'a> {
    frame: &'a TransactionFrame,
    source: PublicKey,
    hash: Hash256,
    signatures: &'a [DecoratedSignature],
}

pub(crate) fn apply_transaction(
    state: &mut LedgerState,
    frame: &TransactionFrame,
    header: &LedgerHeader,
) -> TxOutcome {
    let malformed = || TxOutcome::Rejected(Diagnostics::transaction(codes::TX_MALFORMED));
    let Ok(source) = frame.source_account() else {
        return malformed();
    };

    if !frame.is_fee_bump() {
        let Ok(hash) = frame.hash(&header.network) else {
            return malformed();
        };
        let inner = InnerTx {
            frame,
            source,
            hash,
            signatures: frame.signatures(),
        };
        let ops = frame.operation_count() as i64;
        if frame.fee() < ops * LEDGER_BASE_FEE as i64 {
            return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_INSUFFICIENT_FEE));
        }
        if let Err(d) = check_valid(state, &inner, header) {
            return TxOutcome::Rejected(d);
        }
        if !can_pay(state, &source, frame.fee()) {
            return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_INSUFFICIENT_BALANCE));
        }
        let charged = frame.fee().min(ops * LEDGER_BASE_FEE as i64);
        return TxOutcome::Included(apply_operations(state, &inner, &source, charged, header));
    }

    let (Ok(outer_hash), Ok(inner_hash), Ok(fee_source)) = (
        frame.hash(&header.network),
        frame.inner_hash(&header.network),
        frame.fee_source(),
    ) else {
        return malformed();
    };

    let ops = frame.operation_count();
    let required = minimum_outer_fee(ops, frame.inner_fee(), LEDGER_BASE_FEE);
    if frame.fee() < required {
        debug!(outer_fee = frame.fee(), required, "Fee bump below minimum");
        return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_INSUFFICIENT_FEE));
    }
    let Some(fee_account) = state.snapshot(&fee_source, header.close_time) else {
        return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_NO_SOURCE_ACCOUNT));
    };
    let mut checker = SignatureChecker::new(outer_hash, frame.signatures());
    let needed = fee_account.thresholds().for_level(ThresholdLevel::Low) as u32;
    if !checker.check_signature(&account_signers(&fee_account), needed) {
        return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_BAD_AUTH));
    }
    if !checker.check_all_signatures_used() {
        return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_BAD_AUTH_EXTRA));
    }
    if !can_pay(state, &fee_source, frame.fee()) {
        return TxOutcome::Rejected(Diagnostics::transaction(codes::TX_INSUFFICIENT_BALANCE));
    }

    let inner = InnerTx {
        frame,
        source,
        hash: inner_hash,
        signatures: frame.inner_signatures(),
    };
    let wrap = |d: Diagnostics| {
        let mut outer = Diagnostics::transaction(codes::TX_FEE_BUMP_INNER_FAILED);
        outer.inner_transaction = d.transaction;
        outer.operations = d.operations;
        outer
    };
    if let Err(d) = check_valid(state, &inner, header) {
        return TxOutcome::Rejected(wrap(d));
    }
    let charged = frame.fee().min((ops as i64 + 1) * LEDGER_BASE_FEE as i64);
    TxOutcome::Included(apply_operations(state, &inner, &fee_source, charged, header).map_err(wrap))
}

fn can_pay(state: &LedgerState, payer: &PublicKey, fee: i64) -> bool {
    state.account(payer).is_some_and(|a| a.balance >= fee)
}

/// Checks everything that decides whether the ledger accepts the
/// transaction at all.
fn check_valid(state: &LedgerState, tx: &InnerTx<'_>, header: &LedgerHeader) -> Result<(), Diagnostics> {
    let frame = tx.frame;
    if frame.operation_count() == 0 {
        return Err(Diagnostics::transaction(codes::TX_MISSING_OPERATION));
    }
    if let Some(bounds) = frame.time_bounds() {
        if header.close_time < bounds.min_time.0 {
            return Err(Diagnostics::transaction(codes::TX_TOO_EARLY));
        }
        if bounds.max_time.0 != 0 && header.close_time > bounds.max_time.0 {
            return Err(Diagnostics::transaction(codes::TX_TOO_LATE));
        }
    }

    let Some(source) = state.snapshot(&tx.source, header.close_time) else {
        return Err(Diagnostics::transaction(codes::TX_NO_SOURCE_ACCOUNT));
    };
    if source.next_sequence() != Some(frame.sequence_number()) {
        debug!(
            account = %tx.source,
            expected = ?source.next_sequence(),
            got = frame.sequence_number(),
            "Bad sequence number"
        );
        return Err(Diagnostics::transaction(codes::TX_BAD_SEQ));
    }

    let mut checker = SignatureChecker::new(tx.hash, tx.signatures);
    let low = source.thresholds().for_level(ThresholdLevel::Low) as u32;
    if !checker.check_signature(&account_signers(&source), low) {
        return Err(Diagnostics::transaction(codes::TX_BAD_AUTH));
    }

    let mut op_codes = Vec::with_capacity(frame.operation_count());
    let mut failed = false;
    for op in frame.operations() {
        let op_source = match &op.source_account {
            Some(muxed) => muxed_key(muxed).ok(),
            None => Some(tx.source),
        };
        let account = op_source.and_then(|id| state.snapshot(&id, header.close_time));
        let authorized = match (account, op_source) {
            (Some(account), _) => {
                let needed = account.thresholds().for_level(get_threshold_level(op)) as u32;
                Some(checker.check_signature(&account_signers(&account), needed))
            }
            // An account created earlier in the same transaction must sign
            // with its own key.
            (None, Some(key)) => Some(checker.check_signature(&[Signer { key, weight: 1 }], 0)),
            (None, None) => None,
        };
        let code = match authorized {
            None => codes::OP_NO_ACCOUNT,
            Some(true) => codes::OP_SUCCESS,
            Some(false) => codes::OP_BAD_AUTH,
        };
        failed |= code != codes::OP_SUCCESS;
        op_codes.push(code);
    }
    if failed {
        return Err(Diagnostics::operations(&op_codes));
    }
    if !checker.check_all_signatures_used() {
        return Err(Diagnostics::transaction(codes::TX_BAD_AUTH_EXTRA));
    }
    Ok(())
}

/// Charges the fee, consumes the sequence number, then runs every
/// operation against a scratch copy of the state.
fn apply_operations(
    state: &mut LedgerState,
    tx: &InnerTx<'_>,
    fee_payer: &PublicKey,
    fee: i64,
    header: &LedgerHeader,
) -> Result<(), Diagnostics> {
    if let Some(payer) = state.accounts.get_mut(fee_payer) {
        payer.balance -= fee.min(payer.balance);
    }
    if let Some(source) = state.accounts.get_mut(&tx.source) {
        source.seq_num = tx.frame.sequence_number();
    }

    let mut scratch = state.clone();
    scratch.sponsorships.clear();
    let mut op_codes = Vec::with_capacity(tx.frame.operation_count());

    for (index, op) in tx.frame.operations().iter().enumerate() {
        let op_source = match &op.source_account {
            Some(muxed) => match muxed_key(muxed) {
                Ok(key) => key,
                Err(code) => {
                    op_codes.push(code);
                    return Err(Diagnostics::operations(&op_codes));
                }
            },
            None => tx.source,
        };
        let ctx = OpContext {
            close_time: header.close_time as i64,
            ledger_seq: header.ledger_seq,
            tx_source: tx.source,
            tx_seq: tx.frame.sequence_number(),
            op_index: index as u32,
        };
        match execute(op, &op_source, &mut scratch, &ctx) {
            Ok(()) => op_codes.push(codes::OP_SUCCESS),
            Err(code) => {
                trace!(index, code, "Operation failed");
                op_codes.push(code);
                return Err(Diagnostics::operations(&op_codes));
            }
        }
    }

    if !scratch.sponsorships.is_empty() {
        return Err(Diagnostics::transaction(codes::TX_BAD_SPONSORSHIP));
    }
    *state = scratch;
    Ok(())
}
