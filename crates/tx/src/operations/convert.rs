//! Encoding of typed operations to their XDR form.

use stellar_xdr::curr::{
    BeginSponsoringFutureReservesOp, BumpSequenceOp, ChangeTrustAsset, ChangeTrustOp,
    ClaimClaimableBalanceOp, ClawbackOp, CreateAccountOp, CreateClaimableBalanceOp,
    CreatePassiveSellOfferOp, DataValue, LiquidityPoolDepositOp, LiquidityPoolWithdrawOp,
    ManageBuyOfferOp, ManageDataOp, ManageSellOfferOp, OperationBody as X, PathPaymentStrictReceiveOp,
    PathPaymentStrictSendOp, PaymentOp, SequenceNumber, SetOptionsOp, SetTrustLineFlagsOp,
    SignerKey, String32, String64, Uint256, VecM,
};

use super::{ChangeTrustLine, Operation, OperationBody, SetOptions};
use crate::asset::Asset;
use crate::error::TxError;

impl Operation {
    /// Encodes the operation. Call [`Operation::validate`] first; encoding
    /// only fails where a value does not fit its wire bound.
    pub fn to_xdr(&self) -> Result<stellar_xdr::curr::Operation, TxError> {
        Ok(stellar_xdr::curr::Operation {
            source_account: self.source.as_ref().map(|s| s.to_muxed_account()),
            body: encode_body(&self.body)?,
        })
    }
}

fn encode_body(body: &OperationBody) -> Result<X, TxError> {
    Ok(match body {
        OperationBody::CreateAccount {
            destination,
            starting_balance,
        } => X::CreateAccount(CreateAccountOp {
            destination: destination.to_account_id(),
            starting_balance: *starting_balance,
        }),
        OperationBody::Payment {
            destination,
            asset,
            amount,
        } => X::Payment(PaymentOp {
            destination: destination.to_muxed_account(),
            asset: asset.to_xdr(),
            amount: *amount,
        }),
        OperationBody::PathPaymentStrictReceive {
            send_asset,
            send_max,
            destination,
            dest_asset,
            dest_amount,
            path,
        } => X::PathPaymentStrictReceive(PathPaymentStrictReceiveOp {
            send_asset: send_asset.to_xdr(),
            send_max: *send_max,
            destination: destination.to_muxed_account(),
            dest_asset: dest_asset.to_xdr(),
            dest_amount: *dest_amount,
            path: encode_path(path)?,
        }),
        OperationBody::PathPaymentStrictSend {
            send_asset,
            send_amount,
            destination,
            dest_asset,
            dest_min,
            path,
        } => X::PathPaymentStrictSend(PathPaymentStrictSendOp {
            send_asset: send_asset.to_xdr(),
            send_amount: *send_amount,
            destination: destination.to_muxed_account(),
            dest_asset: dest_asset.to_xdr(),
            dest_min: *dest_min,
            path: encode_path(path)?,
        }),
        OperationBody::ManageSellOffer {
            selling,
            buying,
            amount,
            price,
            offer_id,
        } => X::ManageSellOffer(ManageSellOfferOp {
            selling: selling.to_xdr(),
            buying: buying.to_xdr(),
            amount: *amount,
            price: (*price).into(),
            offer_id: *offer_id,
        }),
        OperationBody::ManageBuyOffer {
            selling,
            buying,
            buy_amount,
            price,
            offer_id,
        } => X::ManageBuyOffer(ManageBuyOfferOp {
            selling: selling.to_xdr(),
            buying: buying.to_xdr(),
            buy_amount: *buy_amount,
            price: (*price).into(),
            offer_id: *offer_id,
        }),
        OperationBody::CreatePassiveSellOffer {
            selling,
            buying,
            amount,
            price,
        } => X::CreatePassiveSellOffer(CreatePassiveSellOfferOp {
            selling: selling.to_xdr(),
            buying: buying.to_xdr(),
            amount: *amount,
            price: (*price).into(),
        }),
        OperationBody::SetOptions(opts) => X::SetOptions(encode_set_options(opts)?),
        OperationBody::ChangeTrust { line, limit } => X::ChangeTrust(ChangeTrustOp {
            line: match line {
                ChangeTrustLine::Asset(asset) => match asset.to_xdr() {
                    stellar_xdr::curr::Asset::Native => ChangeTrustAsset::Native,
                    stellar_xdr::curr::Asset::CreditAlphanum4(a) => ChangeTrustAsset::CreditAlphanum4(a),
                    stellar_xdr::curr::Asset::CreditAlphanum12(a) => ChangeTrustAsset::CreditAlphanum12(a),
                },
                ChangeTrustLine::PoolShare(params) => ChangeTrustAsset::PoolShare(params.to_xdr()),
            },
            limit: *limit,
        }),
        OperationBody::AccountMerge { destination } => X::AccountMerge(destination.to_muxed_account()),
        OperationBody::ManageData { name, value } => X::ManageData(ManageDataOp {
            data_name: String64(name.as_bytes().to_vec().try_into()?),
            data_value: match value {
                Some(v) => Some(DataValue(v.clone().try_into()?)),
                None => None,
            },
        }),
        OperationBody::BumpSequence { bump_to } => X::BumpSequence(BumpSequenceOp {
            bump_to: SequenceNumber(*bump_to),
        }),
        OperationBody::CreateClaimableBalance {
            asset,
            amount,
            claimants,
        } => X::CreateClaimableBalance(CreateClaimableBalanceOp {
            asset: asset.to_xdr(),
            amount: *amount,
            claimants: claimants
                .iter()
                .map(|c| c.to_xdr())
                .collect::<Result<Vec<_>, _>>()?
                .try_into()?,
        }),
        OperationBody::ClaimClaimableBalance { balance_id } => {
            X::ClaimClaimableBalance(ClaimClaimableBalanceOp {
                balance_id: balance_id.to_xdr(),
            })
        }
        OperationBody::BeginSponsoringFutureReserves { sponsored } => {
            X::BeginSponsoringFutureReserves(BeginSponsoringFutureReservesOp {
                sponsored_id: sponsored.to_account_id(),
            })
        }
        OperationBody::EndSponsoringFutureReserves => X::EndSponsoringFutureReserves,
        OperationBody::Clawback {
            asset,
            from,
            amount,
        } => X::Clawback(ClawbackOp {
            asset: asset.to_xdr(),
            from: from.to_muxed_account(),
            amount: *amount,
        }),
        OperationBody::SetTrustLineFlags {
            trustor,
            asset,
            clear_flags,
            set_flags,
        } => X::SetTrustLineFlags(SetTrustLineFlagsOp {
            trustor: trustor.to_account_id(),
            asset: asset.to_xdr(),
            clear_flags: *clear_flags,
            set_flags: *set_flags,
        }),
        OperationBody::LiquidityPoolDeposit {
            pool_id,
            max_amount_a,
            max_amount_b,
            min_price,
            max_price,
        } => X::LiquidityPoolDeposit(LiquidityPoolDepositOp {
            liquidity_pool_id: pool_id.to_xdr(),
            max_amount_a: *max_amount_a,
            max_amount_b: *max_amount_b,
            min_price: (*min_price).into(),
            max_price: (*max_price).into(),
        }),
        OperationBody::LiquidityPoolWithdraw {
            pool_id,
            amount,
            min_amount_a,
            min_amount_b,
        } => X::LiquidityPoolWithdraw(LiquidityPoolWithdrawOp {
            liquidity_pool_id: pool_id.to_xdr(),
            amount: *amount,
            min_amount_a: *min_amount_a,
            min_amount_b: *min_amount_b,
        }),
    })
}

fn encode_path(path: &[Asset]) -> Result<VecM<stellar_xdr::curr::Asset, 5>, TxError> {
    Ok(path.iter().map(Asset::to_xdr).collect::<Vec<_>>().try_into()?)
}

fn encode_set_options(opts: &SetOptions) -> Result<SetOptionsOp, TxError> {
    Ok(SetOptionsOp {
        inflation_dest: opts.inflation_dest.as_ref().map(|k| k.to_account_id()),
        clear_flags: opts.clear_flags,
        set_flags: opts.set_flags,
        master_weight: opts.master_weight.map(u32::from),
        low_threshold: opts.low_threshold.map(u32::from),
        med_threshold: opts.med_threshold.map(u32::from),
        high_threshold: opts.high_threshold.map(u32::from),
        home_domain: match &opts.home_domain {
            Some(d) => Some(String32(d.as_bytes().to_vec().try_into()?)),
            None => None,
        },
        signer: opts.signer.map(|s| stellar_xdr::curr::Signer {
            key: SignerKey::Ed25519(Uint256(*s.key.as_bytes())),
            weight: u32::from(s.weight),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimPredicate, Claimant};
    use crate::pool::PoolParameters;
    use questline_common::Price;
    use questline_crypto::{PublicKey, SecretKey};

    fn key(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn test_source_override_is_encoded() {
        let op = Operation::payment(key(1), Asset::Native, 10).with_source(key(2));
        let xdr = op.to_xdr().unwrap();
        assert_eq!(xdr.source_account, Some(key(2).to_muxed_account()));
    }

    #[test]
    fn test_manage_data_bytes() {
        let op = Operation::manage_data("Hello", Some(b"Stellar Quest!".to_vec()));
        match op.to_xdr().unwrap().body {
            X::ManageData(data) => {
                assert_eq!(data.data_name.0.as_slice(), b"Hello");
                assert_eq!(data.data_value.unwrap().0.as_slice(), b"Stellar Quest!");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_price_is_exact_fraction() {
        let price: Price = "0.1".parse().unwrap();
        let usdc = Asset::credit("USDC", key(7)).unwrap();
        let op = Operation::manage_sell_offer(Asset::Native, usdc, 100, price, 0);
        match op.to_xdr().unwrap().body {
            X::ManageSellOffer(offer) => {
                assert_eq!(offer.price.n, 1);
                assert_eq!(offer.price.d, 10);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_claimants_and_pool_trust_encode() {
        let op = Operation::create_claimable_balance(
            Asset::Native,
            100,
            vec![
                Claimant::new(key(1), ClaimPredicate::not_before_relative(300)),
                Claimant::unconditional(key(2)),
            ],
        );
        match op.to_xdr().unwrap().body {
            X::CreateClaimableBalance(cb) => assert_eq!(cb.claimants.len(), 2),
            other => panic!("unexpected body {:?}", other),
        }

        let params =
            PoolParameters::constant_product(Asset::Native, Asset::credit("USDC", key(7)).unwrap()).unwrap();
        let trust = Operation::change_trust_pool(params, i64::MAX);
        assert!(matches!(
            trust.to_xdr().unwrap().body,
            X::ChangeTrust(ChangeTrustOp {
                line: ChangeTrustAsset::PoolShare(_),
                ..
            })
        ));
    }

    #[test]
    fn test_signer_weight_encoding() {
        let op = Operation::add_signer(key(3), 2);
        match op.to_xdr().unwrap().body {
            X::SetOptions(set) => {
                let signer = set.signer.unwrap();
                assert_eq!(signer.weight, 2);
                assert_eq!(signer.key, SignerKey::Ed25519(Uint256(*key(3).as_bytes())));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }
}
