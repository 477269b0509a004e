//! Trustlines: creation and removal, issuer authorization, clawback.

use questline_client::codes;
use questline_crypto::PublicKey;
use questline_tx::operations::{
    AUTH_REVOCABLE_FLAG, TRUSTLINE_AUTHORIZED_FLAG, TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG,
    TRUSTLINE_CLAWBACK_ENABLED_FLAG,
};
use questline_tx::{Asset, BalanceLine, PoolParameters};
use stellar_xdr::curr::{
    ChangeTrustAsset, ChangeTrustOp, ClawbackOp, LiquidityPoolParameters, SetTrustLineFlagsOp,
};

use super::{account_key, asset, muxed_key};
use crate::state::{line_of, LedgerState, OpResult, PoolEntry, TrustLineEntry};

enum TrustTarget {
    Credit(Asset),
    Pool(PoolParameters),
}

fn target(line: &ChangeTrustAsset) -> OpResult<TrustTarget> {
    match line {
        ChangeTrustAsset::Native => Err(codes::OP_MALFORMED),
        ChangeTrustAsset::CreditAlphanum4(a) => Ok(TrustTarget::Credit(asset(
            &stellar_xdr::curr::Asset::CreditAlphanum4(a.clone()),
        )?)),
        ChangeTrustAsset::CreditAlphanum12(a) => Ok(TrustTarget::Credit(asset(
            &stellar_xdr::curr::Asset::CreditAlphanum12(a.clone()),
        )?)),
        ChangeTrustAsset::PoolShare(LiquidityPoolParameters::LiquidityPoolConstantProduct(p)) => {
            let params = PoolParameters::new(asset(&p.asset_a)?, asset(&p.asset_b)?, p.fee)
                .map_err(|_| codes::OP_MALFORMED)?;
            Ok(TrustTarget::Pool(params))
        }
    }
}

pub(super) fn change_trust(op: &ChangeTrustOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    if op.limit < 0 {
        return Err(codes::OP_MALFORMED);
    }
    let target = target(&op.line)?;
    let (line, subentries) = match &target {
        TrustTarget::Credit(a) => {
            if a.issuer() == Some(source) {
                return Err(codes::OP_MALFORMED);
            }
            (line_of(a), 1)
        }
        TrustTarget::Pool(params) => {
            let id = params.pool_id().map_err(|_| codes::OP_MALFORMED)?;
            (BalanceLine::PoolShare(id), 2)
        }
    };

    if let Some(existing) = state.trustline(source, &line).cloned() {
        if op.limit == 0 {
            if existing.balance != 0 {
                return Err(codes::OP_INVALID_LIMIT);
            }
            state.trustlines.remove(&(*source, line.clone()));
            state.remove_subentries(source, subentries, existing.sponsor)?;
            if let BalanceLine::PoolShare(id) = &line {
                let empty = match state.pools.get_mut(id) {
                    Some(pool) => {
                        pool.trustline_count = pool.trustline_count.saturating_sub(1);
                        pool.trustline_count == 0
                    }
                    None => false,
                };
                if empty {
                    state.pools.remove(id);
                }
            }
            return Ok(());
        }
        if op.limit < existing.balance {
            return Err(codes::OP_INVALID_LIMIT);
        }
        if let Some(tl) = state.trustline_mut(source, &line) {
            tl.limit = op.limit;
        }
        return Ok(());
    }

    if op.limit == 0 {
        return Err(codes::OP_INVALID_LIMIT);
    }

    let flags = match &target {
        TrustTarget::Credit(a) => state.initial_trustline_flags(a)?,
        TrustTarget::Pool(params) => {
            for a in [params.asset_a(), params.asset_b()] {
                if !a.is_native()
                    && a.issuer() != Some(source)
                    && state.trustline(source, &line_of(a)).is_none()
                {
                    return Err(codes::OP_TRUST_LINE_MISSING);
                }
            }
            TRUSTLINE_AUTHORIZED_FLAG
        }
    };

    let sponsor = state.add_subentries(source, subentries)?;
    state.trustlines.insert(
        (*source, line.clone()),
        TrustLineEntry {
            balance: 0,
            limit: op.limit,
            flags,
            sponsor,
        },
    );
    if let (TrustTarget::Pool(params), BalanceLine::PoolShare(id)) = (target, &line) {
        state
            .pools
            .entry(*id)
            .or_insert_with(|| PoolEntry {
                params,
                reserve_a: 0,
                reserve_b: 0,
                total_shares: 0,
                trustline_count: 0,
            })
            .trustline_count += 1;
    }
    Ok(())
}

pub(super) fn set_trust_line_flags(
    op: &SetTrustLineFlagsOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    let asset = asset(&op.asset)?;
    if asset.issuer() != Some(source) {
        return Err(codes::OP_MALFORMED);
    }
    if op.set_flags & TRUSTLINE_CLAWBACK_ENABLED_FLAG != 0 {
        return Err(codes::OP_MALFORMED);
    }
    let trustor = account_key(&op.trustor)?;
    let issuer_flags = state.account(source).map(|a| a.flags).unwrap_or(0);

    let line = state
        .trustline_mut(&trustor, &line_of(&asset))
        .ok_or(codes::OP_NO_TRUST)?;
    let next = (line.flags & !op.clear_flags) | op.set_flags;
    let auth_bits = TRUSTLINE_AUTHORIZED_FLAG | TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG;
    if next & auth_bits == auth_bits {
        return Err(codes::OP_MALFORMED);
    }
    let revoking = line.flags & TRUSTLINE_AUTHORIZED_FLAG != 0 && next & TRUSTLINE_AUTHORIZED_FLAG == 0;
    if revoking && issuer_flags & AUTH_REVOCABLE_FLAG == 0 {
        return Err(codes::OP_CANT_REVOKE);
    }
    line.flags = next;
    Ok(())
}

pub(super) fn clawback(op: &ClawbackOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    if op.amount <= 0 {
        return Err(codes::OP_MALFORMED);
    }
    let asset = asset(&op.asset)?;
    let from = muxed_key(&op.from)?;
    if asset.issuer() != Some(source) || from == *source {
        return Err(codes::OP_MALFORMED);
    }

    let line = state
        .trustline_mut(&from, &line_of(&asset))
        .ok_or(codes::OP_NO_TRUST)?;
    if !line.is_clawback_enabled() {
        return Err(codes::OP_NOT_CLAWBACK_ENABLED);
    }
    if line.balance < op.amount {
        return Err(codes::OP_UNDERFUNDED);
    }
    line.balance -= op.amount;
    Ok(())
}
