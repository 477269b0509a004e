//! Operation catalog.
//!
//! Each ledger operation family is a variant of [`OperationBody`] with typed
//! fields. Operations are checked structurally when a transaction is built
//! (see [`Operation::validate`]) so a malformed parameter fails before any
//! network call, and are encoded to XDR only after they pass.
//!
//! Every operation may name an acting source that differs from the
//! transaction's source account; that account must then also sign.

mod convert;
mod validate;

use questline_common::Price;
use questline_crypto::PublicKey;

use crate::asset::Asset;
use crate::claim::{ClaimableBalanceId, Claimant};
use crate::pool::{LiquidityPoolId, PoolParameters};

/// Account flag: trustlines need issuer authorization.
pub const AUTH_REQUIRED_FLAG: u32 = 0x1;
/// Account flag: issuer may revoke authorization.
pub const AUTH_REVOCABLE_FLAG: u32 = 0x2;
/// Account flag: flags can never change again.
pub const AUTH_IMMUTABLE_FLAG: u32 = 0x4;
/// Account flag: new trustlines inherit clawback.
pub const AUTH_CLAWBACK_ENABLED_FLAG: u32 = 0x8;
pub const ACCOUNT_FLAGS_MASK: u32 =
    AUTH_REQUIRED_FLAG | AUTH_REVOCABLE_FLAG | AUTH_IMMUTABLE_FLAG | AUTH_CLAWBACK_ENABLED_FLAG;

/// Trustline flag: holder may transact in the asset.
pub const TRUSTLINE_AUTHORIZED_FLAG: u32 = 0x1;
/// Trustline flag: holder may only maintain existing liabilities.
pub const TRUSTLINE_AUTHORIZED_TO_MAINTAIN_LIABILITIES_FLAG: u32 = 0x2;
/// Trustline flag: issuer may claw back.
pub const TRUSTLINE_CLAWBACK_ENABLED_FLAG: u32 = 0x4;

/// Longest path a path payment may route through.
pub const MAX_PATH_LENGTH: usize = 5;
/// Most claimants a single claimable balance may name.
pub const MAX_CLAIMANTS: usize = 10;

/// Signer weight requirement class of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThresholdLevel {
    Low,
    Medium,
    High,
}

/// The asset side of a `changeTrust`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTrustLine {
    Asset(Asset),
    PoolShare(PoolParameters),
}

/// Adds, reweights, or (with weight 0) removes an additional signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerChange {
    pub key: PublicKey,
    pub weight: u8,
}

/// `setOptions` fields; `None` leaves the account's value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub inflation_dest: Option<PublicKey>,
    pub clear_flags: Option<u32>,
    pub set_flags: Option<u32>,
    pub master_weight: Option<u8>,
    pub low_threshold: Option<u8>,
    pub med_threshold: Option<u8>,
    pub high_threshold: Option<u8>,
    pub home_domain: Option<String>,
    pub signer: Option<SignerChange>,
}

impl SetOptions {
    /// True if the change touches weights, thresholds, or signers.
    pub fn changes_security(&self) -> bool {
        self.master_weight.is_some()
            || self.low_threshold.is_some()
            || self.med_threshold.is_some()
            || self.high_threshold.is_some()
            || self.signer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationBody {
    CreateAccount {
        destination: PublicKey,
        starting_balance: i64,
    },
    Payment {
        destination: PublicKey,
        asset: Asset,
        amount: i64,
    },
    PathPaymentStrictReceive {
        send_asset: Asset,
        send_max: i64,
        destination: PublicKey,
        dest_asset: Asset,
        dest_amount: i64,
        path: Vec<Asset>,
    },
    PathPaymentStrictSend {
        send_asset: Asset,
        send_amount: i64,
        destination: PublicKey,
        dest_asset: Asset,
        dest_min: i64,
        path: Vec<Asset>,
    },
    ManageSellOffer {
        selling: Asset,
        buying: Asset,
        amount: i64,
        price: Price,
        offer_id: i64,
    },
    ManageBuyOffer {
        selling: Asset,
        buying: Asset,
        buy_amount: i64,
        price: Price,
        offer_id: i64,
    },
    CreatePassiveSellOffer {
        selling: Asset,
        buying: Asset,
        amount: i64,
        price: Price,
    },
    SetOptions(SetOptions),
    ChangeTrust {
        line: ChangeTrustLine,
        limit: i64,
    },
    AccountMerge {
        destination: PublicKey,
    },
    ManageData {
        name: String,
        value: Option<Vec<u8>>,
    },
    BumpSequence {
        bump_to: i64,
    },
    CreateClaimableBalance {
        asset: Asset,
        amount: i64,
        claimants: Vec<Claimant>,
    },
    ClaimClaimableBalance {
        balance_id: ClaimableBalanceId,
    },
    BeginSponsoringFutureReserves {
        sponsored: PublicKey,
    },
    EndSponsoringFutureReserves,
    Clawback {
        asset: Asset,
        from: PublicKey,
        amount: i64,
    },
    SetTrustLineFlags {
        trustor: PublicKey,
        asset: Asset,
        clear_flags: u32,
        set_flags: u32,
    },
    LiquidityPoolDeposit {
        pool_id: LiquidityPoolId,
        max_amount_a: i64,
        max_amount_b: i64,
        min_price: Price,
        max_price: Price,
    },
    LiquidityPoolWithdraw {
        pool_id: LiquidityPoolId,
        amount: i64,
        min_amount_a: i64,
        min_amount_b: i64,
    },
}

impl OperationBody {
    /// Stable camelCase name of the operation family.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationBody::CreateAccount { .. } => "createAccount",
            OperationBody::Payment { .. } => "payment",
            OperationBody::PathPaymentStrictReceive { .. } => "pathPaymentStrictReceive",
            OperationBody::PathPaymentStrictSend { .. } => "pathPaymentStrictSend",
            OperationBody::ManageSellOffer { .. } => "manageSellOffer",
            OperationBody::ManageBuyOffer { .. } => "manageBuyOffer",
            OperationBody::CreatePassiveSellOffer { .. } => "createPassiveSellOffer",
            OperationBody::SetOptions(_) => "setOptions",
            OperationBody::ChangeTrust { .. } => "changeTrust",
            OperationBody::AccountMerge { .. } => "accountMerge",
            OperationBody::ManageData { .. } => "manageData",
            OperationBody::BumpSequence { .. } => "bumpSequence",
            OperationBody::CreateClaimableBalance { .. } => "createClaimableBalance",
            OperationBody::ClaimClaimableBalance { .. } => "claimClaimableBalance",
            OperationBody::BeginSponsoringFutureReserves { .. } => "beginSponsoringFutureReserves",
            OperationBody::EndSponsoringFutureReserves => "endSponsoringFutureReserves",
            OperationBody::Clawback { .. } => "clawback",
            OperationBody::SetTrustLineFlags { .. } => "setTrustLineFlags",
            OperationBody::LiquidityPoolDeposit { .. } => "liquidityPoolDeposit",
            OperationBody::LiquidityPoolWithdraw { .. } => "liquidityPoolWithdraw",
        }
    }

    pub fn threshold_level(&self) -> ThresholdLevel {
        match self {
            OperationBody::SetTrustLineFlags { .. }
            | OperationBody::BumpSequence { .. }
            | OperationBody::ClaimClaimableBalance { .. } => ThresholdLevel::Low,
            OperationBody::AccountMerge { .. } => ThresholdLevel::High,
            OperationBody::SetOptions(opts) if opts.changes_security() => ThresholdLevel::High,
            _ => ThresholdLevel::Medium,
        }
    }
}

/// One operation with an optional acting source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub source: Option<PublicKey>,
    pub body: OperationBody,
}

impl From<OperationBody> for Operation {
    fn from(body: OperationBody) -> Self {
        Self { source: None, body }
    }
}

impl Operation {
    /// Runs this operation on behalf of `source` instead of the transaction
    /// source account.
    pub fn with_source(mut self, source: PublicKey) -> Self {
        self.source = Some(source);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    pub fn threshold_level(&self) -> ThresholdLevel {
        self.body.threshold_level()
    }

    pub fn create_account(destination: PublicKey, starting_balance: i64) -> Self {
        OperationBody::CreateAccount {
            destination,
            starting_balance,
        }
        .into()
    }

    pub fn payment(destination: PublicKey, asset: Asset, amount: i64) -> Self {
        OperationBody::Payment {
            destination,
            asset,
            amount,
        }
        .into()
    }

    pub fn path_payment_strict_receive(
        send_asset: Asset,
        send_max: i64,
        destination: PublicKey,
        dest_asset: Asset,
        dest_amount: i64,
        path: Vec<Asset>,
    ) -> Self {
        OperationBody::PathPaymentStrictReceive {
            send_asset,
            send_max,
            destination,
            dest_asset,
            dest_amount,
            path,
        }
        .into()
    }

    pub fn path_payment_strict_send(
        send_asset: Asset,
        send_amount: i64,
        destination: PublicKey,
        dest_asset: Asset,
        dest_min: i64,
        path: Vec<Asset>,
    ) -> Self {
        OperationBody::PathPaymentStrictSend {
            send_asset,
            send_amount,
            destination,
            dest_asset,
            dest_min,
            path,
        }
        .into()
    }

    /// `offer_id` 0 creates a new offer; `amount` 0 deletes an existing one.
    pub fn manage_sell_offer(
        selling: Asset,
        buying: Asset,
        amount: i64,
        price: Price,
        offer_id: i64,
    ) -> Self {
        OperationBody::ManageSellOffer {
            selling,
            buying,
            amount,
            price,
            offer_id,
        }
        .into()
    }

    pub fn manage_buy_offer(
        selling: Asset,
        buying: Asset,
        buy_amount: i64,
        price: Price,
        offer_id: i64,
    ) -> Self {
        OperationBody::ManageBuyOffer {
            selling,
            buying,
            buy_amount,
            price,
            offer_id,
        }
        .into()
    }

    pub fn create_passive_sell_offer(selling: Asset, buying: Asset, amount: i64, price: Price) -> Self {
        OperationBody::CreatePassiveSellOffer {
            selling,
            buying,
            amount,
            price,
        }
        .into()
    }

    pub fn set_options(options: SetOptions) -> Self {
        OperationBody::SetOptions(options).into()
    }

    pub fn set_home_domain(domain: impl Into<String>) -> Self {
        Self::set_options(SetOptions {
            home_domain: Some(domain.into()),
            ..Default::default()
        })
    }

    pub fn add_signer(key: PublicKey, weight: u8) -> Self {
        Self::set_options(SetOptions {
            signer: Some(SignerChange { key, weight }),
            ..Default::default()
        })
    }

    pub fn change_trust(asset: Asset, limit: i64) -> Self {
        OperationBody::ChangeTrust {
            line: ChangeTrustLine::Asset(asset),
            limit,
        }
        .into()
    }

    pub fn change_trust_pool(params: PoolParameters, limit: i64) -> Self {
        OperationBody::ChangeTrust {
            line: ChangeTrustLine::PoolShare(params),
            limit,
        }
        .into()
    }

    pub fn account_merge(destination: PublicKey) -> Self {
        OperationBody::AccountMerge { destination }.into()
    }

    /// `value` of `None` deletes the entry.
    pub fn manage_data(name: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        OperationBody::ManageData {
            name: name.into(),
            value,
        }
        .into()
    }

    pub fn bump_sequence(bump_to: i64) -> Self {
        OperationBody::BumpSequence { bump_to }.into()
    }

    pub fn create_claimable_balance(asset: Asset, amount: i64, claimants: Vec<Claimant>) -> Self {
        OperationBody::CreateClaimableBalance {
            asset,
            amount,
            claimants,
        }
        .into()
    }

    pub fn claim_claimable_balance(balance_id: ClaimableBalanceId) -> Self {
        OperationBody::ClaimClaimableBalance { balance_id }.into()
    }

    pub fn begin_sponsoring_future_reserves(sponsored: PublicKey) -> Self {
        OperationBody::BeginSponsoringFutureReserves { sponsored }.into()
    }

    pub fn end_sponsoring_future_reserves() -> Self {
        OperationBody::EndSponsoringFutureReserves.into()
    }

    pub fn clawback(asset: Asset, from: PublicKey, amount: i64) -> Self {
        OperationBody::Clawback {
            asset,
            from,
            amount,
        }
        .into()
    }

    pub fn set_trust_line_flags(trustor: PublicKey, asset: Asset, clear_flags: u32, set_flags: u32) -> Self {
        OperationBody::SetTrustLineFlags {
            trustor,
            asset,
            clear_flags,
            set_flags,
        }
        .into()
    }

    pub fn liquidity_pool_deposit(
        pool_id: LiquidityPoolId,
        max_amount_a: i64,
        max_amount_b: i64,
        min_price: Price,
        max_price: Price,
    ) -> Self {
        OperationBody::LiquidityPoolDeposit {
            pool_id,
            max_amount_a,
            max_amount_b,
            min_price,
            max_price,
        }
        .into()
    }

    pub fn liquidity_pool_withdraw(
        pool_id: LiquidityPoolId,
        amount: i64,
        min_amount_a: i64,
        min_amount_b: i64,
    ) -> Self {
        OperationBody::LiquidityPoolWithdraw {
            pool_id,
            amount,
            min_amount_a,
            min_amount_b,
        }
        .into()
    }
}

/// Threshold level required by an encoded operation.
///
/// - **Low**: `AllowTrust`, `SetTrustLineFlags`, `BumpSequence`,
///   `ClaimClaimableBalance`
/// - **High**: `AccountMerge`, and `SetOptions` when it changes weights,
///   thresholds or signers
/// - **Medium**: everything else
pub fn get_threshold_level(op: &stellar_xdr::curr::Operation) -> ThresholdLevel {
    use stellar_xdr::curr::OperationBody as X;
    match &op.body {
        X::AllowTrust(_) | X::SetTrustLineFlags(_) | X::BumpSequence(_) | X::ClaimClaimableBalance(_) => {
            ThresholdLevel::Low
        }
        X::AccountMerge(_) => ThresholdLevel::High,
        X::SetOptions(set) => {
            if set.master_weight.is_some()
                || set.low_threshold.is_some()
                || set.med_threshold.is_some()
                || set.high_threshold.is_some()
                || set.signer.is_some()
            {
                ThresholdLevel::High
            } else {
                ThresholdLevel::Medium
            }
        }
        _ => ThresholdLevel::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_crypto::SecretKey;

    fn key(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn test_threshold_levels() {
        assert_eq!(Operation::bump_sequence(5).threshold_level(), ThresholdLevel::Low);
        assert_eq!(
            Operation::payment(key(1), Asset::Native, 1).threshold_level(),
            ThresholdLevel::Medium
        );
        assert_eq!(Operation::account_merge(key(1)).threshold_level(), ThresholdLevel::High);
        assert_eq!(Operation::add_signer(key(2), 1).threshold_level(), ThresholdLevel::High);
        assert_eq!(
            Operation::set_home_domain("example.com").threshold_level(),
            ThresholdLevel::Medium
        );
    }

    #[test]
    fn test_encoded_threshold_matches_typed() {
        let ops = vec![
            Operation::bump_sequence(5),
            Operation::payment(key(1), Asset::Native, 1),
            Operation::account_merge(key(1)),
            Operation::add_signer(key(2), 1),
            Operation::set_home_domain("example.com"),
        ];
        for op in ops {
            let encoded = op.to_xdr().unwrap();
            assert_eq!(get_threshold_level(&encoded), op.threshold_level(), "{}", op.kind());
        }
    }

    #[test]
    fn test_with_source_overrides() {
        let op = Operation::change_trust(Asset::credit("USDC", key(3)).unwrap(), i64::MAX)
            .with_source(key(4));
        assert_eq!(op.source, Some(key(4)));
        assert_eq!(op.kind(), "changeTrust");
    }
}
