//! Constant-product liquidity pools: deposit, withdraw and swaps.
//!
//! All pools charge [`POOL_FEE_BPS`] on the amount paid in. Share and
//! reserve arithmetic uses 128-bit intermediates and never floating point.

use questline_client::codes;
use questline_common::math::{big_divide, big_square_root, Rounding};
use questline_common::Price;
use questline_crypto::PublicKey;
use questline_tx::{Asset, BalanceLine, LiquidityPoolId, POOL_FEE_BPS};
use stellar_xdr::curr::{LiquidityPoolDepositOp, LiquidityPoolWithdrawOp};

use super::price;
use crate::state::{line_of, LedgerState, OpResult};

const MAX_BPS: i64 = 10_000;

/// Amount of `asset` `holder` could spend right now.
fn available(state: &LedgerState, holder: &PublicKey, asset: &Asset) -> i64 {
    if asset.issuer() == Some(holder) {
        return i64::MAX;
    }
    match asset {
        Asset::Native => state
            .account(holder)
            .map(|a| a.available_balance().max(0))
            .unwrap_or(0),
        credit => state
            .trustline(holder, &line_of(credit))
            .map(|t| t.balance)
            .unwrap_or(0),
    }
}

/// Maps source-side trustline codes to the plain ones pool results use.
fn as_pool_code(code: &'static str) -> &'static str {
    match code {
        codes::OP_SRC_NO_TRUST => codes::OP_NO_TRUST,
        codes::OP_SRC_NOT_AUTHORIZED => codes::OP_NOT_AUTHORIZED,
        other => other,
    }
}

/// True if `a / b` falls outside `[min, max]`.
fn is_bad_price(a: i64, b: i64, min: &Price, max: &Price) -> bool {
    if a <= 0 || b <= 0 {
        return true;
    }
    let (a, b) = (a as i128, b as i128);
    a * (min.d as i128) < b * (min.n as i128) || a * (max.d as i128) > b * (max.n as i128)
}

struct Deposit {
    a: i64,
    b: i64,
    shares: i64,
}

fn deposit_amounts(
    max_a: i64,
    max_b: i64,
    reserve_a: i64,
    reserve_b: i64,
    total_shares: i64,
) -> OpResult<Deposit> {
    if total_shares == 0 {
        let shares = big_square_root(max_a, max_b).map_err(|_| codes::OP_MALFORMED)?;
        return Ok(Deposit {
            a: max_a,
            b: max_b,
            shares,
        });
    }
    let shares_a = big_divide(total_shares, max_a, reserve_a, Rounding::Down).ok();
    let shares_b = big_divide(total_shares, max_b, reserve_b, Rounding::Down).ok();
    let shares = match (shares_a, shares_b) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Err(codes::OP_LINE_FULL),
    };
    let a = big_divide(shares, reserve_a, total_shares, Rounding::Up)
        .map_err(|_| codes::OP_LINE_FULL)?;
    let b = big_divide(shares, reserve_b, total_shares, Rounding::Up)
        .map_err(|_| codes::OP_LINE_FULL)?;
    Ok(Deposit { a, b, shares })
}

pub(super) fn deposit(
    op: &LiquidityPoolDepositOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    if op.max_amount_a <= 0 || op.max_amount_b <= 0 {
        return Err(codes::OP_MALFORMED);
    }
    let min_price = price(&op.min_price)?;
    let max_price = price(&op.max_price)?;
    let pool_id = LiquidityPoolId::from(&op.liquidity_pool_id);
    let share_line = BalanceLine::PoolShare(pool_id);

    let share_trust = state
        .trustline(source, &share_line)
        .ok_or(codes::OP_NO_TRUST)?
        .clone();
    let pool = state.pool(&pool_id).ok_or(codes::OP_NO_TRUST)?.clone();
    let (asset_a, asset_b) = (pool.params.asset_a().clone(), pool.params.asset_b().clone());

    let deposit = deposit_amounts(
        op.max_amount_a,
        op.max_amount_b,
        pool.reserve_a,
        pool.reserve_b,
        pool.total_shares,
    )?;
    if available(state, source, &asset_a) < deposit.a
        || available(state, source, &asset_b) < deposit.b
    {
        return Err(codes::OP_UNDERFUNDED);
    }
    if is_bad_price(deposit.a, deposit.b, &min_price, &max_price) {
        return Err(codes::OP_BAD_PRICE);
    }
    if share_trust.limit - share_trust.balance < deposit.shares {
        return Err(codes::OP_LINE_FULL);
    }
    if pool.reserve_a.checked_add(deposit.a).is_none()
        || pool.reserve_b.checked_add(deposit.b).is_none()
    {
        return Err(codes::OP_LINE_FULL);
    }

    state
        .debit(source, &asset_a, deposit.a)
        .map_err(as_pool_code)?;
    state
        .debit(source, &asset_b, deposit.b)
        .map_err(as_pool_code)?;
    if let Some(line) = state.trustline_mut(source, &share_line) {
        line.balance += deposit.shares;
    }
    if let Some(pool) = state.pools.get_mut(&pool_id) {
        pool.reserve_a += deposit.a;
        pool.reserve_b += deposit.b;
        pool.total_shares += deposit.shares;
    }
    Ok(())
}

pub(super) fn withdraw(
    op: &LiquidityPoolWithdrawOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    if op.amount <= 0 || op.min_amount_a < 0 || op.min_amount_b < 0 {
        return Err(codes::OP_MALFORMED);
    }
    let pool_id = LiquidityPoolId::from(&op.liquidity_pool_id);
    let share_line = BalanceLine::PoolShare(pool_id);

    let held = state
        .trustline(source, &share_line)
        .ok_or(codes::OP_NO_TRUST)?
        .balance;
    if held < op.amount {
        return Err(codes::OP_UNDERFUNDED);
    }
    let pool = state.pool(&pool_id).ok_or(codes::OP_NO_TRUST)?.clone();

    let (out_a, out_b) = withdraw_amounts(op.amount, pool.reserve_a, pool.reserve_b, pool.total_shares)?;
    if out_a < op.min_amount_a || out_b < op.min_amount_b {
        return Err(codes::OP_UNDER_MINIMUM);
    }

    state.credit(source, pool.params.asset_a(), out_a)?;
    state.credit(source, pool.params.asset_b(), out_b)?;
    if let Some(line) = state.trustline_mut(source, &share_line) {
        line.balance -= op.amount;
    }
    if let Some(pool) = state.pools.get_mut(&pool_id) {
        pool.reserve_a -= out_a;
        pool.reserve_b -= out_b;
        pool.total_shares -= op.amount;
    }
    Ok(())
}

/// Reserves paid out for redeeming `shares`, rounded down.
fn withdraw_amounts(shares: i64, reserve_a: i64, reserve_b: i64, total_shares: i64) -> OpResult<(i64, i64)> {
    let a = big_divide(shares, reserve_a, total_shares, Rounding::Down).map_err(|_| codes::OP_MALFORMED)?;
    let b = big_divide(shares, reserve_b, total_shares, Rounding::Down).map_err(|_| codes::OP_MALFORMED)?;
    Ok((a, b))
}

/// Reserves of the pool trading `from` for `to`, oriented as
/// `(pool id, reserve of from, reserve of to)`.
fn oriented(state: &LedgerState, from: &Asset, to: &Asset) -> OpResult<(LiquidityPoolId, i64, i64)> {
    let id = state
        .pool_between(from, to)
        .ok_or(codes::OP_TOO_FEW_OFFERS)?;
    let pool = state.pool(&id).ok_or(codes::OP_TOO_FEW_OFFERS)?;
    if pool.reserve_a <= 0 || pool.reserve_b <= 0 {
        return Err(codes::OP_TOO_FEW_OFFERS);
    }
    if pool.params.asset_a() == from {
        Ok((id, pool.reserve_a, pool.reserve_b))
    } else {
        Ok((id, pool.reserve_b, pool.reserve_a))
    }
}

fn settle(state: &mut LedgerState, id: &LiquidityPoolId, from: &Asset, paid_in: i64, paid_out: i64) {
    if let Some(pool) = state.pools.get_mut(id) {
        if pool.params.asset_a() == from {
            pool.reserve_a += paid_in;
            pool.reserve_b -= paid_out;
        } else {
            pool.reserve_b += paid_in;
            pool.reserve_a -= paid_out;
        }
    }
}

/// `floor(x * y / z)` for a `u128` product that may not fit.
fn mul_div_floor(x: u128, y: u128, z: u128) -> Option<u128> {
    let q = y / z;
    let r = y % z;
    x.checked_mul(q)?.checked_add(x.checked_mul(r)? / z)
}

/// `ceil(x * y / z)` for a `u128` product that may not fit.
fn mul_div_ceil(x: u128, y: u128, z: u128) -> Option<u128> {
    let q = y / z;
    let r = y % z;
    x.checked_mul(q)?.checked_add(x.checked_mul(r)?.div_ceil(z))
}

/// Output of paying `amount_in` of `from` into the pool for `to`.
pub(super) fn swap_strict_send(
    state: &mut LedgerState,
    from: &Asset,
    to: &Asset,
    amount_in: i64,
) -> OpResult<i64> {
    let (id, reserve_in, reserve_out) = oriented(state, from, to)?;
    if amount_in > i64::MAX - reserve_in {
        return Err(codes::OP_TOO_FEW_OFFERS);
    }
    let fee_bps = POOL_FEE_BPS as i64;
    let denominator = (MAX_BPS as u128) * (reserve_in as u128)
        + ((MAX_BPS - fee_bps) as u128) * (amount_in as u128);
    let out = mul_div_floor(
        (MAX_BPS - fee_bps) as u128,
        (reserve_out as u128) * (amount_in as u128),
        denominator,
    )
    .and_then(|v| i64::try_from(v).ok())
    .ok_or(codes::OP_TOO_FEW_OFFERS)?;
    if out <= 0 || out >= reserve_out {
        return Err(codes::OP_TOO_FEW_OFFERS);
    }
    settle(state, &id, from, amount_in, out);
    Ok(out)
}

/// Input of `from` needed to take `amount_out` of `to` from the pool.
pub(super) fn swap_strict_receive(
    state: &mut LedgerState,
    from: &Asset,
    to: &Asset,
    amount_out: i64,
) -> OpResult<i64> {
    let (id, reserve_in, reserve_out) = oriented(state, from, to)?;
    if amount_out >= reserve_out {
        return Err(codes::OP_TOO_FEW_OFFERS);
    }
    let fee_bps = POOL_FEE_BPS as i64;
    let denominator = ((reserve_out - amount_out) as u128) * ((MAX_BPS - fee_bps) as u128);
    let amount_in = mul_div_ceil(
        MAX_BPS as u128,
        (reserve_in as u128) * (amount_out as u128),
        denominator,
    )
    .and_then(|v| i64::try_from(v).ok())
    .ok_or(codes::OP_TOO_FEW_OFFERS)?;
    if amount_in > i64::MAX - reserve_in {
        return Err(codes::OP_TOO_FEW_OFFERS);
    }
    settle(state, &id, from, amount_in, amount_out);
    Ok(amount_in)
}
