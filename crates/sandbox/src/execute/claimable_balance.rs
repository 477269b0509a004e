//! Claimable balances.

use questline_client::codes;
use questline_crypto::PublicKey;
use questline_tx::claim::{evaluate, to_absolute};
use questline_tx::ClaimableBalanceId;
use stellar_xdr::curr::{Claimant, ClaimClaimableBalanceOp, CreateClaimableBalanceOp};
use tracing::trace;

use super::{account_key, asset, OpContext};
use crate::state::{ClaimableBalanceEntry, LedgerState, OpResult};

pub(super) fn create_claimable_balance(
    op: &CreateClaimableBalanceOp,
    source: &PublicKey,
    state: &mut LedgerState,
    ctx: &OpContext,
) -> OpResult {
    if op.amount <= 0 || op.claimants.is_empty() {
        return Err(codes::OP_MALFORMED);
    }
    let asset = asset(&op.asset)?;

    let mut claimants = Vec::with_capacity(op.claimants.len());
    for claimant in op.claimants.iter() {
        let Claimant::ClaimantTypeV0(v0) = claimant;
        claimants.push((
            account_key(&v0.destination)?,
            to_absolute(&v0.predicate, ctx.close_time),
        ));
    }

    // One base reserve per claimant, paid by the creator or its sponsor.
    let sponsor = state.sponsorships.get(source).copied().unwrap_or(*source);
    let payer = state.account_mut(&sponsor)?;
    payer.num_sponsoring += claimants.len() as u32;
    if payer.available_balance() < 0 {
        return Err(codes::OP_LOW_RESERVE);
    }

    state.debit(source, &asset, op.amount).map_err(|code| match code {
        codes::OP_SRC_NO_TRUST => codes::OP_NO_TRUST,
        codes::OP_SRC_NOT_AUTHORIZED => codes::OP_NOT_AUTHORIZED,
        other => other,
    })?;

    let id = ClaimableBalanceId::derive(&ctx.tx_source, ctx.tx_seq, ctx.op_index)
        .map_err(|_| codes::OP_MALFORMED)?;
    trace!(balance_id = %id, amount = op.amount, "Created claimable balance");
    state.claimable_balances.insert(
        id,
        ClaimableBalanceEntry {
            id,
            asset,
            amount: op.amount,
            claimants,
            sponsor,
        },
    );
    Ok(())
}

pub(super) fn claim_claimable_balance(
    op: &ClaimClaimableBalanceOp,
    source: &PublicKey,
    state: &mut LedgerState,
    ctx: &OpContext,
) -> OpResult {
    let id = ClaimableBalanceId::from(&op.balance_id);
    let entry = state
        .claimable_balances
        .get(&id)
        .ok_or(codes::OP_DOES_NOT_EXIST)?
        .clone();

    let claimable = entry
        .claimants
        .iter()
        .any(|(dest, predicate)| dest == source && evaluate(predicate, ctx.close_time));
    if !claimable {
        return Err(codes::OP_CANNOT_CLAIM);
    }

    state.credit(source, &entry.asset, entry.amount)?;
    state.claimable_balances.remove(&id);
    let payer = state.account_mut(&entry.sponsor)?;
    payer.num_sponsoring = payer
        .num_sponsoring
        .saturating_sub(entry.claimants.len() as u32);
    Ok(())
}
