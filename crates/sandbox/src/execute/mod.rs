//! Operation execution.
//!
//! Each handler applies one XDR operation to a [`LedgerState`] on behalf of
//! its effective source account and returns the result code name on
//! failure. Handlers never leave partial effects the caller must undo: the
//! transaction applier runs every operation against a scratch copy of the
//! state.

mod account;
mod claimable_balance;
mod liquidity_pool;
mod offer;
mod payment;
mod sponsorship;
mod trust;

use questline_client::codes;
use questline_common::Price;
use questline_crypto::PublicKey;
use questline_tx::Asset;
use stellar_xdr::curr::{AccountId, MuxedAccount, Operation, OperationBody};

use crate::state::{LedgerState, OpResult};

/// Ledger and transaction facts an operation may depend on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpContext {
    pub close_time: i64,
    pub ledger_seq: u32,
    /// Source and sequence of the (inner) transaction.
    pub tx_source: PublicKey,
    pub tx_seq: i64,
    pub op_index: u32,
}

pub(crate) fn execute(
    op: &Operation,
    source: &PublicKey,
    state: &mut LedgerState,
    ctx: &OpContext,
) -> OpResult {
    if state.account(source).is_none() {
        return Err(codes::OP_NO_ACCOUNT);
    }

    match &op.body {
        OperationBody::CreateAccount(o) => account::create_account(o, source, state, ctx),
        OperationBody::Payment(o) => payment::payment(o, source, state),
        OperationBody::PathPaymentStrictReceive(o) => {
            payment::path_payment_strict_receive(o, source, state)
        }
        OperationBody::PathPaymentStrictSend(o) => {
            payment::path_payment_strict_send(o, source, state)
        }
        OperationBody::ManageSellOffer(o) => offer::manage_sell_offer(o, source, state),
        OperationBody::ManageBuyOffer(o) => offer::manage_buy_offer(o, source, state),
        OperationBody::CreatePassiveSellOffer(o) => {
            offer::create_passive_sell_offer(o, source, state)
        }
        OperationBody::SetOptions(o) => account::set_options(o, source, state),
        OperationBody::ChangeTrust(o) => trust::change_trust(o, source, state),
        OperationBody::AccountMerge(dest) => account::account_merge(dest, source, state),
        OperationBody::ManageData(o) => account::manage_data(o, source, state),
        OperationBody::BumpSequence(o) => account::bump_sequence(o, source, state),
        OperationBody::CreateClaimableBalance(o) => {
            claimable_balance::create_claimable_balance(o, source, state, ctx)
        }
        OperationBody::ClaimClaimableBalance(o) => {
            claimable_balance::claim_claimable_balance(o, source, state, ctx)
        }
        OperationBody::BeginSponsoringFutureReserves(o) => {
            sponsorship::begin_sponsoring(o, source, state)
        }
        OperationBody::EndSponsoringFutureReserves => sponsorship::end_sponsoring(source, state),
        OperationBody::Clawback(o) => trust::clawback(o, source, state),
        OperationBody::SetTrustLineFlags(o) => trust::set_trust_line_flags(o, source, state),
        OperationBody::LiquidityPoolDeposit(o) => liquidity_pool::deposit(o, source, state),
        OperationBody::LiquidityPoolWithdraw(o) => liquidity_pool::withdraw(o, source, state),
        _ => Err(codes::OP_NOT_SUPPORTED),
    }
}

pub(crate) fn account_key(id: &AccountId) -> OpResult<PublicKey> {
    PublicKey::try_from(id).map_err(|_| codes::OP_MALFORMED)
}

pub(crate) fn muxed_key(account: &MuxedAccount) -> OpResult<PublicKey> {
    PublicKey::try_from(account).map_err(|_| codes::OP_MALFORMED)
}

pub(crate) fn asset(asset: &stellar_xdr::curr::Asset) -> OpResult<Asset> {
    Asset::from_xdr(asset).map_err(|_| codes::OP_MALFORMED)
}

pub(crate) fn price(price: &stellar_xdr::curr::Price) -> OpResult<Price> {
    Price::new(price.n, price.d).map_err(|_| codes::OP_BAD_PRICE)
}
