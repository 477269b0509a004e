//! Account-level operations: creation, merge, options, data and sequence.

use questline_client::codes;
use questline_crypto::PublicKey;
use questline_tx::operations::{
    ACCOUNT_FLAGS_MASK, AUTH_CLAWBACK_ENABLED_FLAG, AUTH_IMMUTABLE_FLAG, AUTH_REVOCABLE_FLAG,
};
use questline_tx::Signer;
use stellar_xdr::curr::{
    BumpSequenceOp, CreateAccountOp, ManageDataOp, MuxedAccount, SetOptionsOp, SignerKey,
};

use super::{account_key, muxed_key, OpContext};
use crate::state::{AccountEntry, LedgerState, OpResult, BASE_RESERVE, MAX_SIGNERS};

pub(super) fn create_account(
    op: &CreateAccountOp,
    source: &PublicKey,
    state: &mut LedgerState,
    ctx: &OpContext,
) -> OpResult {
    if op.starting_balance < 0 {
        return Err(codes::OP_MALFORMED);
    }
    let dest = account_key(&op.destination)?;
    if state.account(&dest).is_some() {
        return Err(codes::OP_ALREADY_EXISTS);
    }

    state.debit(source, &questline_tx::Asset::Native, op.starting_balance)?;

    let seq_num = (ctx.ledger_seq as i64) << 32;
    let mut entry = AccountEntry::new(dest, op.starting_balance, seq_num);
    match state.sponsorships.get(&dest).copied() {
        Some(sponsor) => {
            entry.num_sponsored = 2;
            state.accounts.insert(dest, entry);
            let payer = state.account_mut(&sponsor)?;
            payer.num_sponsoring += 2;
            if payer.available_balance() < 0 {
                return Err(codes::OP_LOW_RESERVE);
            }
        }
        None => {
            if op.starting_balance < 2 * BASE_RESERVE {
                return Err(codes::OP_LOW_RESERVE);
            }
            state.accounts.insert(dest, entry);
        }
    }
    Ok(())
}

pub(super) fn account_merge(
    dest: &MuxedAccount,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    let dest = muxed_key(dest)?;
    if dest == *source {
        return Err(codes::OP_MALFORMED);
    }
    if state.account(&dest).is_none() {
        return Err(codes::OP_NO_DESTINATION);
    }
    let entry = state.account(source).ok_or(codes::OP_NO_ACCOUNT)?;
    if entry.flags & AUTH_IMMUTABLE_FLAG != 0 {
        return Err(codes::OP_IMMUTABLE_SET);
    }
    if entry.num_sub_entries > 0 {
        return Err(codes::OP_HAS_SUB_ENTRIES);
    }
    if entry.num_sponsoring > 0 {
        return Err(codes::OP_IS_SPONSOR);
    }

    let balance = entry.balance;
    let target = state.account_mut(&dest)?;
    target.balance = target
        .balance
        .checked_add(balance)
        .ok_or(codes::OP_DEST_FULL)?;
    state.accounts.remove(source);
    Ok(())
}

pub(super) fn bump_sequence(op: &BumpSequenceOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    if op.bump_to.0 < 0 {
        return Err(codes::OP_BAD_SEQ);
    }
    let entry = state.account_mut(source)?;
    if op.bump_to.0 > entry.seq_num {
        entry.seq_num = op.bump_to.0;
    }
    Ok(())
}

pub(super) fn manage_data(op: &ManageDataOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    let name = String::from_utf8(op.data_name.to_vec()).map_err(|_| codes::OP_MALFORMED)?;
    if name.is_empty() {
        return Err(codes::OP_MALFORMED);
    }

    let exists = state
        .account(source)
        .map(|a| a.data.contains_key(&name))
        .unwrap_or(false);
    match &op.data_value {
        Some(value) => {
            if !exists {
                state.add_subentries(source, 1)?;
            }
            state.account_mut(source)?.data.insert(name, value.to_vec());
        }
        None => {
            if !exists {
                return Err(codes::OP_NAME_NOT_FOUND);
            }
            state.account_mut(source)?.data.remove(&name);
            state.remove_subentries(source, 1, None)?;
        }
    }
    Ok(())
}

fn threshold(value: Option<u32>) -> OpResult<Option<u8>> {
    value
        .map(|v| u8::try_from(v).map_err(|_| codes::OP_MALFORMED))
        .transpose()
}

pub(super) fn set_options(op: &SetOptionsOp, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    let set_flags = op.set_flags.unwrap_or(0);
    let clear_flags = op.clear_flags.unwrap_or(0);
    if (set_flags | clear_flags) & !ACCOUNT_FLAGS_MASK != 0 || set_flags & clear_flags != 0 {
        return Err(codes::OP_MALFORMED);
    }

    let entry = state.account(source).ok_or(codes::OP_NO_ACCOUNT)?;
    if (set_flags | clear_flags) != 0 {
        if entry.flags & AUTH_IMMUTABLE_FLAG != 0 {
            return Err(codes::OP_CANT_CHANGE);
        }
        let next = (entry.flags | set_flags) & !clear_flags;
        if next & AUTH_CLAWBACK_ENABLED_FLAG != 0 && next & AUTH_REVOCABLE_FLAG == 0 {
            return Err(codes::OP_AUTH_REVOCABLE_REQUIRED);
        }
    }

    // Signer changes come first: they may need a reserve.
    if let Some(change) = &op.signer {
        let SignerKey::Ed25519(bytes) = &change.key else {
            return Err(codes::OP_NOT_SUPPORTED);
        };
        let key = PublicKey::from_bytes(&bytes.0).map_err(|_| codes::OP_MALFORMED)?;
        if key == *source {
            return Err(codes::OP_MALFORMED);
        }
        let weight = u8::try_from(change.weight).map_err(|_| codes::OP_MALFORMED)?;
        let existing = entry.signers.iter().position(|s| s.key == key);
        match (existing, weight) {
            (Some(pos), 0) => {
                state.account_mut(source)?.signers.remove(pos);
                state.remove_subentries(source, 1, None)?;
            }
            (Some(pos), w) => state.account_mut(source)?.signers[pos].weight = w,
            (None, 0) => {}
            (None, w) => {
                if entry.signers.len() >= MAX_SIGNERS {
                    return Err(codes::OP_TOO_MANY_SIGNERS);
                }
                state.add_subentries(source, 1)?;
                let signers = &mut state.account_mut(source)?.signers;
                signers.push(Signer { key, weight: w });
                signers.sort_by(|a, b| a.key.cmp(&b.key));
            }
        }
    }

    let master_weight = threshold(op.master_weight)?;
    let low = threshold(op.low_threshold)?;
    let med = threshold(op.med_threshold)?;
    let high = threshold(op.high_threshold)?;
    let home_domain = op
        .home_domain
        .as_ref()
        .map(|d| String::from_utf8(d.to_vec()).map_err(|_| codes::OP_MALFORMED))
        .transpose()?;

    let entry = state.account_mut(source)?;
    entry.flags = (entry.flags | set_flags) & !clear_flags;
    if let Some(w) = master_weight {
        entry.master_weight = w;
    }
    if let Some(t) = low {
        entry.thresholds.low = t;
    }
    if let Some(t) = med {
        entry.thresholds.med = t;
    }
    if let Some(t) = high {
        entry.thresholds.high = t;
    }
    if let Some(domain) = home_domain {
        entry.home_domain = (!domain.is_empty()).then_some(domain);
    }
    Ok(())
}
