//! The named flows.
//!
//! Each flow is a plain struct holding the keys and parameters it needs and
//! implementing [`Flow`](crate::Flow). Flows that derive an identifier in
//! one step and use it in a later one return it as their output.

mod basic;
mod claimable_balance;
mod clawback;
mod fee_bump;
mod issuance;
mod liquidity_pool;
mod multisig;
mod sequence;
mod sponsorship;

pub use basic::{
    AccountMergeFlow, ChangeTrustFlow, CreateAccountFlow, HomeDomainFlow, ManageDataFlow,
    PaymentFlow, DEFAULT_STARTING_BALANCE,
};
pub use claimable_balance::{ClaimFlow, ClaimableBalanceFlow, DEFAULT_CLAIM_DELAY_SECS};
pub use clawback::{ClawbackFlow, ISSUER_FLAGS};
pub use fee_bump::FeeBumpFlow;
pub use issuance::{AssetIssuanceFlow, OfferKind};
pub use liquidity_pool::{LiquidityPoolFlow, PoolDeposit};
pub use multisig::{MultisigPaymentFlow, MultisigThresholdFlow};
pub use sequence::{SequenceBumpFlow, DEFAULT_BUMP};
pub use sponsorship::SponsoredAccountCreation;
