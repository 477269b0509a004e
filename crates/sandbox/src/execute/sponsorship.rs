//! Sponsorship of future reserves.
//!
//! A begin/end pair is only meaningful inside one transaction: the applier
//! clears open sponsorships afterwards and fails the transaction with
//! `tx_bad_sponsorship` if any were left open.

use questline_client::codes;
use questline_crypto::PublicKey;
use stellar_xdr::curr::BeginSponsoringFutureReservesOp;

use super::account_key;
use crate::state::{LedgerState, OpResult};

pub(super) fn begin_sponsoring(
    op: &BeginSponsoringFutureReservesOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    let sponsored = account_key(&op.sponsored_id)?;
    if sponsored == *source {
        return Err(codes::OP_MALFORMED);
    }
    if state.sponsorships.contains_key(&sponsored) {
        return Err(codes::OP_ALREADY_SPONSORED);
    }
    let source_is_sponsored = state.sponsorships.contains_key(source);
    let sponsored_is_sponsoring = state.sponsorships.values().any(|s| *s == sponsored);
    if source_is_sponsored || sponsored_is_sponsoring {
        return Err(codes::OP_RECURSIVE);
    }
    state.sponsorships.insert(sponsored, *source);
    Ok(())
}

pub(super) fn end_sponsoring(source: &PublicKey, state: &mut LedgerState) -> OpResult {
    state
        .sponsorships
        .remove(source)
        .map(|_| ())
        .ok_or(codes::OP_NOT_SPONSORED)
}
