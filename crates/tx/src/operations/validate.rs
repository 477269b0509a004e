//! Structural checks run before an operation is encoded.
//!
//! These reject inputs the ledger would reject as malformed regardless of
//! ledger state. State-dependent failures (underfunded, no trust, bad auth)
//! are left to the ledger.

use questline_common::asset::is_string_valid;
use questline_common::Price;

use super::{
    ChangeTrustLine, Operation, OperationBody, SetOptions, ACCOUNT_FLAGS_MASK, MAX_CLAIMANTS,
    MAX_PATH_LENGTH, TRUSTLINE_AUTHORIZED_FLAG, TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG,
    TRUSTLINE_CLAWBACK_ENABLED_FLAG,
};
use crate::asset::Asset;
use crate::error::OperationValidationError as E;

const MAX_HOME_DOMAIN_LEN: usize = 32;
const MAX_DATA_LEN: usize = 64;

type Result = std::result::Result<(), E>;

impl Operation {
    pub fn validate(&self) -> Result {
        match &self.body {
            OperationBody::CreateAccount {
                starting_balance, ..
            } => non_negative(*starting_balance),
            OperationBody::Payment { amount, .. } => positive(*amount),
            OperationBody::PathPaymentStrictReceive {
                send_max,
                dest_amount,
                path,
                ..
            } => {
                positive(*send_max)?;
                positive(*dest_amount)?;
                path_len(path)
            }
            OperationBody::PathPaymentStrictSend {
                send_amount,
                dest_min,
                path,
                ..
            } => {
                positive(*send_amount)?;
                positive(*dest_min)?;
                path_len(path)
            }
            OperationBody::ManageSellOffer {
                selling,
                buying,
                amount,
                price,
                offer_id,
            } => offer(selling, buying, *amount, price, *offer_id),
            OperationBody::ManageBuyOffer {
                selling,
                buying,
                buy_amount,
                price,
                offer_id,
            } => offer(selling, buying, *buy_amount, price, *offer_id),
            OperationBody::CreatePassiveSellOffer {
                selling,
                buying,
                amount,
                price,
            } => {
                positive(*amount)?;
                offer(selling, buying, *amount, price, 0)
            }
            OperationBody::SetOptions(opts) => set_options(opts),
            OperationBody::ChangeTrust { line, limit } => {
                non_negative(*limit)?;
                match line {
                    ChangeTrustLine::Asset(Asset::Native) => {
                        Err(E::InvalidAsset("cannot trust the native asset".into()))
                    }
                    _ => Ok(()),
                }
            }
            OperationBody::AccountMerge { .. } => Ok(()),
            OperationBody::ManageData { name, value } => {
                if name.is_empty() || name.len() > MAX_DATA_LEN || !is_string_valid(name) {
                    return Err(E::InvalidData(format!("bad entry name '{}'", name)));
                }
                match value {
                    Some(v) if v.len() > MAX_DATA_LEN => Err(E::InvalidData(format!(
                        "value of '{}' is {} bytes, max {}",
                        name,
                        v.len(),
                        MAX_DATA_LEN
                    ))),
                    _ => Ok(()),
                }
            }
            OperationBody::BumpSequence { bump_to } => non_negative(*bump_to),
            OperationBody::CreateClaimableBalance {
                amount, claimants, ..
            } => {
                positive(*amount)?;
                if claimants.is_empty() || claimants.len() > MAX_CLAIMANTS {
                    return Err(E::InvalidClaimant(format!(
                        "{} claimants, expected 1 to {}",
                        claimants.len(),
                        MAX_CLAIMANTS
                    )));
                }
                for (i, c) in claimants.iter().enumerate() {
                    if claimants[..i].iter().any(|o| o.destination == c.destination) {
                        return Err(E::InvalidClaimant(format!(
                            "duplicate claimant {}",
                            c.destination
                        )));
                    }
                    c.predicate.validate()?;
                }
                Ok(())
            }
            OperationBody::ClaimClaimableBalance { .. } => Ok(()),
            OperationBody::BeginSponsoringFutureReserves { sponsored } => {
                if Some(sponsored) == self.source.as_ref() {
                    return Err(E::InvalidDestination(
                        "an account cannot sponsor itself".into(),
                    ));
                }
                Ok(())
            }
            OperationBody::EndSponsoringFutureReserves => Ok(()),
            OperationBody::Clawback { asset, from, amount } => {
                positive(*amount)?;
                match asset {
                    Asset::Native => Err(E::InvalidAsset("cannot claw back native".into())),
                    Asset::Credit(c) if c.issuer() == from => {
                        Err(E::InvalidDestination("issuer cannot claw back from itself".into()))
                    }
                    _ => Ok(()),
                }
            }
            OperationBody::SetTrustLineFlags {
                trustor,
                asset,
                clear_flags,
                set_flags,
            } => {
                let mask = TRUSTLINE_AUTHORIZED_FLAG
                    | TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG
                    | TRUSTLINE_CLAWBACK_ENABLED_FLAG;
                if asset.is_native() {
                    return Err(E::InvalidAsset("native has no trustlines".into()));
                }
                if asset.issuer() == Some(trustor) {
                    return Err(E::InvalidDestination("issuer has no trustline".into()));
                }
                if (clear_flags | set_flags) & !mask != 0 {
                    return Err(E::InvalidFlags(format!(
                        "unknown trustline flags set={:#x} clear={:#x}",
                        set_flags, clear_flags
                    )));
                }
                if clear_flags & set_flags != 0 {
                    return Err(E::InvalidFlags("flag both set and cleared".into()));
                }
                if set_flags & TRUSTLINE_CLAWBACK_ENABLED_FLAG != 0 {
                    return Err(E::InvalidFlags("clawback cannot be enabled per trustline".into()));
                }
                let both = TRUSTLINE_AUTHORIZED_FLAG | TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG;
                if set_flags & both == both {
                    return Err(E::InvalidFlags(
                        "authorized and maintain-liabilities are exclusive".into(),
                    ));
                }
                Ok(())
            }
            OperationBody::LiquidityPoolDeposit {
                max_amount_a,
                max_amount_b,
                min_price,
                max_price,
                ..
            } => {
                positive(*max_amount_a)?;
                positive(*max_amount_b)?;
                price(min_price)?;
                price(max_price)?;
                if (min_price.n as i64) * (max_price.d as i64)
                    > (max_price.n as i64) * (min_price.d as i64)
                {
                    return Err(E::InvalidPrice(format!(
                        "min price {} exceeds max price {}",
                        min_price, max_price
                    )));
                }
                Ok(())
            }
            OperationBody::LiquidityPoolWithdraw {
                amount,
                min_amount_a,
                min_amount_b,
                ..
            } => {
                positive(*amount)?;
                non_negative(*min_amount_a)?;
                non_negative(*min_amount_b)
            }
        }
    }
}

fn positive(amount: i64) -> Result {
    if amount > 0 {
        Ok(())
    } else {
        Err(E::InvalidAmount(amount))
    }
}

fn non_negative(amount: i64) -> Result {
    if amount >= 0 {
        Ok(())
    } else {
        Err(E::InvalidAmount(amount))
    }
}

fn price(p: &Price) -> Result {
    if p.n > 0 && p.d > 0 {
        Ok(())
    } else {
        Err(E::InvalidPrice(p.to_string()))
    }
}

fn path_len(path: &[Asset]) -> Result {
    if path.len() > MAX_PATH_LENGTH {
        return Err(E::Other(format!(
            "path of {} hops, max {}",
            path.len(),
            MAX_PATH_LENGTH
        )));
    }
    Ok(())
}

fn offer(selling: &Asset, buying: &Asset, amount: i64, p: &Price, offer_id: i64) -> Result {
    non_negative(amount)?;
    price(p)?;
    if selling == buying {
        return Err(E::InvalidAsset(format!("selling and buying are both {}", selling)));
    }
    if offer_id < 0 {
        return Err(E::Other(format!("negative offer id {}", offer_id)));
    }
    if amount == 0 && offer_id == 0 {
        return Err(E::InvalidAmount(0));
    }
    Ok(())
}

fn set_options(opts: &SetOptions) -> Result {
    let set = opts.set_flags.unwrap_or(0);
    let clear = opts.clear_flags.unwrap_or(0);
    if (set | clear) & !ACCOUNT_FLAGS_MASK != 0 {
        return Err(E::InvalidFlags(format!(
            "unknown account flags set={:#x} clear={:#x}",
            set, clear
        )));
    }
    if set & clear != 0 {
        return Err(E::InvalidFlags("flag both set and cleared".into()));
    }
    if let Some(domain) = &opts.home_domain {
        if domain.len() > MAX_HOME_DOMAIN_LEN || !is_string_valid(domain) {
            return Err(E::InvalidHomeDomain(domain.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimPredicate, Claimant};
    use crate::operations::{AUTH_CLAWBACK_ENABLED_FLAG, AUTH_REQUIRED_FLAG, AUTH_REVOCABLE_FLAG};
    use questline_crypto::{PublicKey, SecretKey};

    fn key(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    fn usdc() -> Asset {
        Asset::credit("USDC", key(9)).unwrap()
    }

    #[test]
    fn test_amounts_must_be_positive() {
        assert!(Operation::payment(key(1), Asset::Native, 0).validate().is_err());
        assert!(Operation::payment(key(1), Asset::Native, -5).validate().is_err());
        assert!(Operation::payment(key(1), Asset::Native, 1).validate().is_ok());
        assert_eq!(
            Operation::create_account(key(1), -1).validate(),
            Err(E::InvalidAmount(-1))
        );
    }

    #[test]
    fn test_offer_checks() {
        let price = Price::new(1, 10).unwrap();
        assert!(Operation::manage_sell_offer(usdc(), Asset::Native, 10, price, 0)
            .validate()
            .is_ok());
        assert!(Operation::manage_sell_offer(usdc(), usdc(), 10, price, 0)
            .validate()
            .is_err());
        assert!(Operation::manage_buy_offer(usdc(), Asset::Native, 0, price, 0)
            .validate()
            .is_err());
        let bad_price = Price { n: 0, d: 1 };
        assert!(Operation::create_passive_sell_offer(usdc(), Asset::Native, 1, bad_price)
            .validate()
            .is_err());
    }

    #[test]
    fn test_manage_data_limits() {
        assert!(Operation::manage_data("Hello", Some(b"World".to_vec())).validate().is_ok());
        assert!(Operation::manage_data("", None).validate().is_err());
        assert!(Operation::manage_data("k", Some(vec![0u8; 65])).validate().is_err());
    }

    #[test]
    fn test_home_domain_length() {
        assert!(Operation::set_home_domain("example.com").validate().is_ok());
        assert!(Operation::set_home_domain("x".repeat(33)).validate().is_err());
    }

    #[test]
    fn test_account_flags() {
        let ok = Operation::set_options(SetOptions {
            set_flags: Some(AUTH_REQUIRED_FLAG | AUTH_REVOCABLE_FLAG | AUTH_CLAWBACK_ENABLED_FLAG),
            ..Default::default()
        });
        assert!(ok.validate().is_ok());
        let unknown = Operation::set_options(SetOptions {
            set_flags: Some(0x20),
            ..Default::default()
        });
        assert!(matches!(unknown.validate(), Err(E::InvalidFlags(_))));
    }

    #[test]
    fn test_claimants() {
        let none = Operation::create_claimable_balance(Asset::Native, 10, vec![]);
        assert!(none.validate().is_err());
        let dup = Operation::create_claimable_balance(
            Asset::Native,
            10,
            vec![Claimant::unconditional(key(1)), Claimant::unconditional(key(1))],
        );
        assert!(dup.validate().is_err());
        let ok = Operation::create_claimable_balance(
            Asset::Native,
            10,
            vec![
                Claimant::new(key(1), ClaimPredicate::not_before_relative(300)),
                Claimant::unconditional(key(2)),
            ],
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_clawback_and_trust_flags() {
        assert!(Operation::clawback(Asset::Native, key(1), 5).validate().is_err());
        assert!(Operation::clawback(usdc(), key(9), 5).validate().is_err());
        assert!(Operation::clawback(usdc(), key(1), 5).validate().is_ok());
        assert!(
            Operation::set_trust_line_flags(key(1), usdc(), 0, TRUSTLINE_AUTHORIZED_FLAG)
                .validate()
                .is_ok()
        );
        assert!(
            Operation::set_trust_line_flags(key(1), usdc(), 0, TRUSTLINE_CLAWBACK_ENABLED_FLAG)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_native_trust_rejected() {
        assert!(Operation::change_trust(Asset::Native, 100).validate().is_err());
        assert!(Operation::change_trust(usdc(), 100).validate().is_ok());
    }
}
