//! Offers are recorded with their reserve and funding checks but are never
//! matched against each other.

use questline_client::codes;
use questline_common::math::{big_divide, Rounding};
use questline_common::Price;
use questline_crypto::PublicKey;
use questline_tx::Asset;
use stellar_xdr::curr::{CreatePassiveSellOfferOp, ManageBuyOfferOp, ManageSellOfferOp};

use super::{asset, price};
use crate::state::{line_of, LedgerState, OfferEntry, OpResult};

struct OfferRequest {
    offer_id: i64,
    selling: Asset,
    buying: Asset,
    amount: i64,
    price: Price,
    passive: bool,
}

fn check_trust(
    state: &LedgerState,
    source: &PublicKey,
    asset: &Asset,
    missing: &'static str,
    unauthorized: &'static str,
) -> OpResult {
    if asset.is_native() || asset.issuer() == Some(source) {
        return Ok(());
    }
    let line = state
        .trustline(source, &line_of(asset))
        .ok_or(missing)?;
    if !line.is_authorized() {
        return Err(unauthorized);
    }
    Ok(())
}

fn place(req: OfferRequest, source: &PublicKey, state: &mut LedgerState) -> OpResult {
    if req.selling == req.buying || req.amount < 0 || req.offer_id < 0 {
        return Err(codes::OP_MALFORMED);
    }

    if req.offer_id != 0 {
        let owned = state
            .offers
            .get(&req.offer_id)
            .is_some_and(|o| o.seller == *source);
        if !owned {
            return Err(codes::OP_NOT_FOUND);
        }
        if req.amount == 0 {
            state.offers.remove(&req.offer_id);
            return state.remove_subentries(source, 1, None);
        }
    } else if req.amount == 0 {
        return Err(codes::OP_MALFORMED);
    }

    check_trust(state, source, &req.selling, codes::OP_SELL_NO_TRUST, codes::OP_SELL_NOT_AUTHORIZED)?;
    check_trust(state, source, &req.buying, codes::OP_BUY_NO_TRUST, codes::OP_BUY_NOT_AUTHORIZED)?;

    let id = if req.offer_id == 0 {
        state.add_subentries(source, 1)?;
        state.next_id()
    } else {
        req.offer_id
    };

    let funded = match &req.selling {
        Asset::Native => state
            .account(source)
            .map(|a| a.available_balance())
            .unwrap_or(0),
        credit if credit.issuer() == Some(source) => i64::MAX,
        credit => state
            .trustline(source, &line_of(credit))
            .map(|t| t.balance)
            .unwrap_or(0),
    };
    if funded < req.amount {
        return Err(codes::OP_UNDERFUNDED);
    }

    state.offers.insert(
        id,
        OfferEntry {
            id,
            seller: *source,
            selling: req.selling,
            buying: req.buying,
            amount: req.amount,
            price: req.price,
            passive: req.passive,
        },
    );
    Ok(())
}

pub(super) fn manage_sell_offer(
    op: &ManageSellOfferOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    place(
        OfferRequest {
            offer_id: op.offer_id,
            selling: asset(&op.selling)?,
            buying: asset(&op.buying)?,
            amount: op.amount,
            price: price(&op.price)?,
            passive: false,
        },
        source,
        state,
    )
}

/// A buy offer is stored as the equivalent sell offer.
pub(super) fn manage_buy_offer(
    op: &ManageBuyOfferOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    let buy_price = price(&op.price)?;
    if op.buy_amount < 0 {
        return Err(codes::OP_MALFORMED);
    }
    let sell_amount = big_divide(op.buy_amount, buy_price.n as i64, buy_price.d as i64, Rounding::Up)
        .map_err(|_| codes::OP_MALFORMED)?;
    place(
        OfferRequest {
            offer_id: op.offer_id,
            selling: asset(&op.selling)?,
            buying: asset(&op.buying)?,
            amount: sell_amount,
            price: Price::new(buy_price.d, buy_price.n).map_err(|_| codes::OP_BAD_PRICE)?,
            passive: false,
        },
        source,
        state,
    )
}

pub(super) fn create_passive_sell_offer(
    op: &CreatePassiveSellOfferOp,
    source: &PublicKey,
    state: &mut LedgerState,
) -> OpResult {
    place(
        OfferRequest {
            offer_id: 0,
            selling: asset(&op.selling)?,
            buying: asset(&op.buying)?,
            amount: op.amount,
            price: price(&op.price)?,
            passive: true,
        },
        source,
        state,
    )
}
