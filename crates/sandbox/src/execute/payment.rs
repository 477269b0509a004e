//! Payments and path payments.
//!
//! Path payments convert hop by hop through constant-product pools only;
//! the sandbox records offers but never crosses them, so a hop without a
//! pool fails with `op_too_few_offers`.

use questline_client::codes;
use questline_crypto::PublicKey;
use questline_tx::Asset;
use stellar_xdr::curr::{PathPaymentStrictReceiveOp, PathPaymentStrictSendOp, PaymentOp};

use super::liquidity_pool::{swap_strict_receive, swap_strict_send};
use super::{asset, muxed_key};
use crate::state::{LedgerState, OpResult};

pub(super) fn payment(op: &PaymentOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    if op.amount <= 0 {
        return Err(codes::OP_MALFORMED);
    }
    let dest = muxed_key(&op.destination)?;
    let asset = asset(&op.asset)?;
    if dest == *source && asset.is_native() {
        return Ok(());
    }
    if state.account(&dest).is_none() && asset.issuer() != Some(&dest) {
        return Err(codes::OP_NO_DESTINATION);
    }

    // Credit first so a self-payment sees its own funds.
    state.credit(&dest, &asset, op.amount)?;
    state.debit(source, &asset, op.amount)
}

fn hops(send: &Asset, path: &[stellar_xdr::curr::Asset], dest: &Asset) -> OpResult<Vec<Asset>> {
    let mut assets = Vec::with_capacity(path.len() + 2);
    assets.push(send.clone());
    for a in path {
        assets.push(asset(a)?);
    }
    assets.push(dest.clone());
    assets.dedup();
    Ok(assets)
}

pub(super) fn path_payment_strict_send(
    op: &PathPaymentStrictSendOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    if op.send_amount <= 0 || op.dest_min <= 0 {
        return Err(codes::OP_MALFORMED);
    }
    let dest = muxed_key(&op.destination)?;
    let send_asset = asset(&op.send_asset)?;
    let dest_asset = asset(&op.dest_asset)?;
    if state.account(&dest).is_none() {
        return Err(codes::OP_NO_DESTINATION);
    }

    state.debit(source, &send_asset, op.send_amount)?;

    let route = hops(&send_asset, &op.path, &dest_asset)?;
    let mut amount = op.send_amount;
    for pair in route.windows(2) {
        amount = swap_strict_send(state, &pair[0], &pair[1], amount)?;
    }
    if amount < op.dest_min {
        return Err(codes::OP_UNDER_DEST_MIN);
    }
    state.credit(&dest, &dest_asset, amount)
}

pub(super) fn path_payment_strict_receive(
    op: &PathPaymentStrictReceiveOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    if op.dest_amount <= 0 || op.send_max <= 0 {
        return Err(codes::OP_MALFORMED);
    }
    let dest = muxed_key(&op.destination)?;
    let send_asset = asset(&op.send_asset)?;
    let dest_asset = asset(&op.dest_asset)?;
    if state.account(&dest).is_none() {
        return Err(codes::OP_NO_DESTINATION);
    }

    state.credit(&dest, &dest_asset, op.dest_amount)?;

    // Work backwards from the amount the destination must receive.
    let route = hops(&send_asset, &op.path, &dest_asset)?;
    let mut amount = op.dest_amount;
    for pair in route.windows(2).rev() {
        amount = swap_strict_receive(state, &pair[0], &pair[1], amount)?;
    }
    if amount > op.send_max {
        return Err(codes::OP_OVER_SOURCE_MAX);
    }
    state.debit(source, &send_asset, amount)
}
