//! Result code names as reported by Horizon.
//!
//! The sandbox ledger reports the same names so both boundaries classify
//! identically.

pub const TX_SUCCESS: &str = "tx_success";
pub const TX_FAILED: &str = "tx_failed";
pub const TX_TOO_EARLY: &str = "tx_too_early";
pub const TX_TOO_LATE: &str = "tx_too_late";
pub const TX_MISSING_OPERATION: &str = "tx_missing_operation";
pub const TX_BAD_SEQ: &str = "tx_bad_seq";
pub const TX_BAD_AUTH: &str = "tx_bad_auth";
pub const TX_INSUFFICIENT_BALANCE: &str = "tx_insufficient_balance";
pub const TX_NO_SOURCE_ACCOUNT: &str = "tx_no_source_account";
pub const TX_INSUFFICIENT_FEE: &str = "tx_insufficient_fee";
pub const TX_BAD_AUTH_EXTRA: &str = "tx_bad_auth_extra";
pub const TX_MALFORMED: &str = "tx_malformed";
pub const TX_FEE_BUMP_INNER_FAILED: &str = "tx_fee_bump_inner_failed";
pub const TX_BAD_SPONSORSHIP: &str = "tx_bad_sponsorship";

pub const OP_SUCCESS: &str = "op_success";
pub const OP_MALFORMED: &str = "op_malformed";
pub const OP_UNDERFUNDED: &str = "op_underfunded";
pub const OP_LOW_RESERVE: &str = "op_low_reserve";
pub const OP_BAD_AUTH: &str = "op_bad_auth";
pub const OP_NO_ACCOUNT: &str = "op_no_account";
pub const OP_NOT_SUPPORTED: &str = "op_not_supported";
pub const OP_NO_DESTINATION: &str = "op_no_destination";
pub const OP_ALREADY_EXISTS: &str = "op_already_exists";
pub const OP_NO_TRUST: &str = "op_no_trust";
pub const OP_SRC_NO_TRUST: &str = "op_src_no_trust";
pub const OP_NOT_AUTHORIZED: &str = "op_not_authorized";
pub const OP_SRC_NOT_AUTHORIZED: &str = "op_src_not_authorized";
pub const OP_NO_ISSUER: &str = "op_no_issuer";
pub const OP_LINE_FULL: &str = "op_line_full";
pub const OP_INVALID_LIMIT: &str = "op_invalid_limit";
pub const OP_CANNOT_CLAIM: &str = "op_cannot_claim";
pub const OP_DOES_NOT_EXIST: &str = "op_does_not_exist";
pub const OP_NOT_CLAWBACK_ENABLED: &str = "op_not_clawback_enabled";
pub const OP_CANT_CHANGE: &str = "op_cant_change";
pub const OP_BAD_SEQ: &str = "op_bad_seq";
pub const OP_HAS_SUB_ENTRIES: &str = "op_has_sub_entries";
pub const OP_IMMUTABLE_SET: &str = "op_immutable_set";
pub const OP_AUTH_REVOCABLE_REQUIRED: &str = "op_auth_revocable_required";
pub const OP_TOO_MANY_SIGNERS: &str = "op_too_many_signers";
pub const OP_BAD_PRICE: &str = "op_bad_price";
pub const OP_UNDER_DEST_MIN: &str = "op_under_dest_min";
pub const OP_OVER_SOURCE_MAX: &str = "op_over_source_max";
pub const OP_TOO_FEW_OFFERS: &str = "op_too_few_offers";
pub const OP_BAD_SPONSORSHIP: &str = "op_bad_sponsorship";
pub const OP_ALREADY_SPONSORED: &str = "op_already_sponsored";
pub const OP_RECURSIVE: &str = "op_recursive";
pub const OP_NOT_SPONSORED: &str = "op_not_sponsored";
pub const OP_NAME_NOT_FOUND: &str = "op_name_not_found";
pub const OP_UNDER_MINIMUM: &str = "op_under_minimum";
pub const OP_TRUST_LINE_MISSING: &str = "op_trust_line_missing";
pub const OP_CANT_REVOKE: &str = "op_cant_revoke";
pub const OP_SELL_NO_TRUST: &str = "op_sell_no_trust";
pub const OP_BUY_NO_TRUST: &str = "op_buy_no_trust";
pub const OP_SELL_NOT_AUTHORIZED: &str = "op_sell_not_authorized";
pub const OP_BUY_NOT_AUTHORIZED: &str = "op_buy_not_authorized";
pub const OP_NOT_FOUND: &str = "op_not_found";
pub const OP_IS_SPONSOR: &str = "op_is_sponsor";
pub const OP_DEST_FULL: &str = "op_dest_full";

pub(crate) fn is_balance_failure(code: &str) -> bool {
    matches!(code, OP_UNDERFUNDED | OP_LOW_RESERVE)
}

pub(crate) fn is_authorization_failure(code: &str) -> bool {
    matches!(
        code,
        OP_NO_TRUST
            | OP_SRC_NO_TRUST
            | OP_NOT_AUTHORIZED
            | OP_SRC_NOT_AUTHORIZED
            | OP_SELL_NO_TRUST
            | OP_BUY_NO_TRUST
            | OP_SELL_NOT_AUTHORIZED
            | OP_BUY_NOT_AUTHORIZED
            | OP_TRUST_LINE_MISSING
            | OP_CANNOT_CLAIM
            | OP_NOT_CLAWBACK_ENABLED
    )
}

/// `TxBadAuthExtra` -> `tx_bad_auth_extra`.
pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("TxBadAuthExtra"), TX_BAD_AUTH_EXTRA);
        assert_eq!(snake_case("TxFeeBumpInnerFailed"), TX_FEE_BUMP_INNER_FAILED);
    }
}
