//! Ledger entries held by the sandbox.
//!
//! [`LedgerState`] is a plain value: applying a transaction works on a clone
//! and the clone replaces the committed state only if every operation
//! succeeds. Operation handlers report failures as result code names from
//! [`questline_client::codes`].

use std::collections::{BTreeMap, HashMap};

use questline_client::codes;
use questline_common::Price;
use questline_crypto::PublicKey;
use questline_tx::operations::{
    AUTH_CLAWBACK_ENABLED_FLAG, AUTH_REQUIRED_FLAG, TRUSTLINE_AUTHORIZED_FLAG,
    TRUSTLINE_CLAWBACK_ENABLED_FLAG,
};
use questline_tx::{
    Account, Asset, Balance, BalanceLine, ClaimableBalanceId, LiquidityPoolId, PoolParameters,
    Signer, Thresholds, POOL_FEE_BPS,
};

/// Reserve per entry, in stroops (0.5 XLM).
pub const BASE_RESERVE: i64 = 5_000_000;
/// Minimum fee per operation, in stroops.
pub const LEDGER_BASE_FEE: u32 = 100;
/// Most additional signers an account may carry.
pub const MAX_SIGNERS: usize = 20;

/// Failure of a single operation: the result code name.
pub type OpResult<T = ()> = std::result::Result<T, &'static str>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    pub id: PublicKey,
    pub balance: i64,
    pub seq_num: i64,
    pub num_sub_entries: u32,
    pub num_sponsoring: u32,
    pub num_sponsored: u32,
    pub flags: u32,
    pub home_domain: Option<String>,
    pub master_weight: u8,
    pub thresholds: Thresholds,
    pub signers: Vec<Signer>,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl AccountEntry {
    pub fn new(id: PublicKey, balance: i64, seq_num: i64) -> Self {
        Self {
            id,
            balance,
            seq_num,
            num_sub_entries: 0,
            num_sponsoring: 0,
            num_sponsored: 0,
            flags: 0,
            home_domain: None,
            master_weight: 1,
            thresholds: Thresholds::default(),
            signers: Vec::new(),
            data: BTreeMap::new(),
        }
    }

    /// `(2 + subentries + sponsoring - sponsored) * base reserve`.
    pub fn minimum_balance(&self) -> i64 {
        let count = 2 + self.num_sub_entries as i64 + self.num_sponsoring as i64
            - self.num_sponsored as i64;
        count * BASE_RESERVE
    }

    pub fn available_balance(&self) -> i64 {
        self.balance - self.minimum_balance()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustLineEntry {
    pub balance: i64,
    pub limit: i64,
    pub flags: u32,
    /// Account paying this line's reserve, if sponsored.
    pub sponsor: Option<PublicKey>,
}

impl TrustLineEntry {
    pub fn is_authorized(&self) -> bool {
        self.flags & TRUSTLINE_AUTHORIZED_FLAG != 0
    }

    pub fn is_clawback_enabled(&self) -> bool {
        self.flags & TRUSTLINE_CLAWBACK_ENABLED_FLAG != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferEntry {
    pub id: i64,
    pub seller: PublicKey,
    pub selling: Asset,
    pub buying: Asset,
    /// Amount of `selling` on offer.
    pub amount: i64,
    /// Price of one unit of `selling` in `buying`.
    pub price: Price,
    pub passive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimableBalanceEntry {
    pub id: ClaimableBalanceId,
    pub asset: Asset,
    pub amount: i64,
    /// Destinations with predicates already rewritten to absolute time.
    pub claimants: Vec<(PublicKey, stellar_xdr::curr::ClaimPredicate)>,
    /// Account paying the per-claimant reserve.
    pub sponsor: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub params: PoolParameters,
    pub reserve_a: i64,
    pub reserve_b: i64,
    pub total_shares: i64,
    pub trustline_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub(crate) accounts: HashMap<PublicKey, AccountEntry>,
    pub(crate) trustlines: HashMap<(PublicKey, BalanceLine), TrustLineEntry>,
    pub(crate) offers: BTreeMap<i64, OfferEntry>,
    pub(crate) claimable_balances: HashMap<ClaimableBalanceId, ClaimableBalanceEntry>,
    pub(crate) pools: HashMap<LiquidityPoolId, PoolEntry>,
    pub(crate) id_pool: i64,
    /// Open sponsorships within the transaction being applied:
    /// sponsored account -> sponsor.
    pub(crate) sponsorships: HashMap<PublicKey, PublicKey>,
}

pub(crate) fn line_of(asset: &Asset) -> BalanceLine {
    match asset {
        Asset::Native => BalanceLine::Native,
        credit => BalanceLine::Credit(credit.clone()),
    }
}

fn is_issuer(holder: &PublicKey, asset: &Asset) -> bool {
    asset.issuer() == Some(holder)
}

impl LedgerState {
    pub fn account(&self, id: &PublicKey) -> Option<&AccountEntry> {
        self.accounts.get(id)
    }

    pub(crate) fn account_mut(&mut self, id: &PublicKey) -> OpResult<&mut AccountEntry> {
        self.accounts.get_mut(id).ok_or(codes::OP_NO_ACCOUNT)
    }

    pub fn trustline(&self, holder: &PublicKey, line: &BalanceLine) -> Option<&TrustLineEntry> {
        self.trustlines.get(&(*holder, line.clone()))
    }

    pub(crate) fn trustline_mut(
        &mut self,
        holder: &PublicKey,
        line: &BalanceLine,
    ) -> Option<&mut TrustLineEntry> {
        self.trustlines.get_mut(&(*holder, line.clone()))
    }

    pub(crate) fn next_id(&mut self) -> i64 {
        self.id_pool += 1;
        self.id_pool
    }

    pub fn pool(&self, id: &LiquidityPoolId) -> Option<&PoolEntry> {
        self.pools.get(id)
    }

    pub fn claimable_balance(&self, id: &ClaimableBalanceId) -> Option<&ClaimableBalanceEntry> {
        self.claimable_balances.get(id)
    }

    /// Open offers owned by `seller`, oldest first.
    pub fn offers_by<'a>(&'a self, seller: &'a PublicKey) -> impl Iterator<Item = &'a OfferEntry> + 'a {
        self.offers.values().filter(move |o| o.seller == *seller)
    }

    /// Inserts a funded account outside of any transaction.
    pub fn insert_account(&mut self, entry: AccountEntry) {
        self.accounts.insert(entry.id, entry);
    }

    /// The constant-product pool trading `a` against `b`, if one exists.
    pub(crate) fn pool_between(&self, a: &Asset, b: &Asset) -> Option<LiquidityPoolId> {
        let id = LiquidityPoolId::derive(a, b, POOL_FEE_BPS).ok()?;
        self.pools.contains_key(&id).then_some(id)
    }

    /// Initial flags for a new trustline to `asset`, from the issuer's flags.
    pub(crate) fn initial_trustline_flags(&self, asset: &Asset) -> OpResult<u32> {
        let issuer = asset.issuer().ok_or(codes::OP_MALFORMED)?;
        let issuer = self.account(issuer).ok_or(codes::OP_NO_ISSUER)?;
        let mut flags = 0;
        if issuer.flags & AUTH_REQUIRED_FLAG == 0 {
            flags |= TRUSTLINE_AUTHORIZED_FLAG;
        }
        if issuer.flags & AUTH_CLAWBACK_ENABLED_FLAG != 0 {
            flags |= TRUSTLINE_CLAWBACK_ENABLED_FLAG;
        }
        Ok(flags)
    }

    /// Charges `count` new subentries of `owner`, to the open sponsor if
    /// there is one. Returns the sponsor.
    pub(crate) fn add_subentries(
        &mut self,
        owner: &PublicKey,
        count: u32,
    ) -> OpResult<Option<PublicKey>> {
        let sponsor = self.sponsorships.get(owner).copied();
        match sponsor {
            Some(sponsor) => {
                let payer = self.account_mut(&sponsor)?;
                payer.num_sponsoring += count;
                if payer.available_balance() < 0 {
                    return Err(codes::OP_LOW_RESERVE);
                }
                let entry = self.account_mut(owner)?;
                entry.num_sub_entries += count;
                entry.num_sponsored += count;
            }
            None => {
                let entry = self.account_mut(owner)?;
                entry.num_sub_entries += count;
                if entry.available_balance() < 0 {
                    return Err(codes::OP_LOW_RESERVE);
                }
            }
        }
        Ok(sponsor)
    }

    /// Releases `count` subentries of `owner`, returning the reserve to
    /// `sponsor` when the entry was sponsored.
    pub(crate) fn remove_subentries(
        &mut self,
        owner: &PublicKey,
        count: u32,
        sponsor: Option<PublicKey>,
    ) -> OpResult {
        let entry = self.account_mut(owner)?;
        entry.num_sub_entries = entry.num_sub_entries.saturating_sub(count);
        if let Some(sponsor) = sponsor {
            entry.num_sponsored = entry.num_sponsored.saturating_sub(count);
            let payer = self.account_mut(&sponsor)?;
            payer.num_sponsoring = payer.num_sponsoring.saturating_sub(count);
        }
        Ok(())
    }

    /// Removes `amount` of `asset` from `holder`. Issuers burn freely.
    pub(crate) fn debit(&mut self, holder: &PublicKey, asset: &Asset, amount: i64) -> OpResult {
        if asset.is_native() {
            let account = self.account_mut(holder)?;
            if account.available_balance() < amount {
                return Err(codes::OP_UNDERFUNDED);
            }
            account.balance -= amount;
            return Ok(());
        }
        if is_issuer(holder, asset) {
            return Ok(());
        }
        let line = self
            .trustline_mut(holder, &line_of(asset))
            .ok_or(codes::OP_SRC_NO_TRUST)?;
        if !line.is_authorized() {
            return Err(codes::OP_SRC_NOT_AUTHORIZED);
        }
        if line.balance < amount {
            return Err(codes::OP_UNDERFUNDED);
        }
        line.balance -= amount;
        Ok(())
    }

    /// Adds `amount` of `asset` to `holder`. Issuers absorb freely.
    pub(crate) fn credit(&mut self, holder: &PublicKey, asset: &Asset, amount: i64) -> OpResult {
        if asset.is_native() {
            let account = self
                .accounts
                .get_mut(holder)
                .ok_or(codes::OP_NO_DESTINATION)?;
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(codes::OP_LINE_FULL)?;
            return Ok(());
        }
        if is_issuer(holder, asset) {
            return Ok(());
        }
        if !self.accounts.contains_key(holder) {
            return Err(codes::OP_NO_DESTINATION);
        }
        let line = self
            .trustline_mut(holder, &line_of(asset))
            .ok_or(codes::OP_NO_TRUST)?;
        if !line.is_authorized() {
            return Err(codes::OP_NOT_AUTHORIZED);
        }
        match line.balance.checked_add(amount) {
            Some(next) if next <= line.limit => {
                line.balance = next;
                Ok(())
            }
            _ => Err(codes::OP_LINE_FULL),
        }
    }

    /// Read-only view of an account as a client would load it.
    pub fn snapshot(&self, id: &PublicKey, loaded_at: u64) -> Option<Account> {
        let entry = self.accounts.get(id)?;
        let mut balances = vec![Balance::native(entry.balance)];
        let mut lines: Vec<Balance> = self
            .trustlines
            .iter()
            .filter(|((holder, _), _)| holder == id)
            .map(|((_, line), tl)| Balance {
                line: line.clone(),
                amount: tl.balance,
                limit: Some(tl.limit),
                authorized: tl.is_authorized(),
                clawback_enabled: tl.is_clawback_enabled(),
            })
            .collect();
        lines.sort_by(|a, b| a.line.to_string().cmp(&b.line.to_string()));
        balances.extend(lines);

        Some(
            Account::loaded(*id, entry.seq_num, loaded_at)
                .with_master_weight(entry.master_weight)
                .with_thresholds(entry.thresholds)
                .with_signers(entry.signers.clone())
                .with_balances(balances)
                .with_flags(entry.flags)
                .with_home_domain(entry.home_domain.clone()),
        )
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
    fn test_minimum_balance_counts_sponsorship() {
        let mut entry = AccountEntry::new(key(1), 0, 0);
        assert_eq!(entry.minimum_balance(), 2 * BASE_RESERVE);
        entry.num_sub_entries = 3;
        entry.num_sponsored = 1;
        assert_eq!(entry.minimum_balance(), 4 * BASE_RESERVE);
        entry.num_sponsoring = 2;
        assert_eq!(entry.minimum_balance(), 6 * BASE_RESERVE);
    }

    #[test]
    fn test_credit_requires_authorized_trustline() {
        let holder = key(1);
        let issuer = key(2);
        let usd = Asset::credit("USD", issuer).unwrap();
        let mut state = LedgerState::default();
        state
            .accounts
            .insert(holder, AccountEntry::new(holder, 100 * BASE_RESERVE, 0));
        assert_eq!(state.credit(&holder, &usd, 10), Err(codes::OP_NO_TRUST));

        state.trustlines.insert(
            (holder, line_of(&usd)),
            TrustLineEntry {
                balance: 0,
                limit: 15,
                flags: 0,
                sponsor: None,
            },
        );
        assert_eq!(state.credit(&holder, &usd, 10), Err(codes::OP_NOT_AUTHORIZED));

        state.trustline_mut(&holder, &line_of(&usd)).unwrap().flags = TRUSTLINE_AUTHORIZED_FLAG;
        assert_eq!(state.credit(&holder, &usd, 10), Ok(()));
        assert_eq!(state.credit(&holder, &usd, 10), Err(codes::OP_LINE_FULL));
        assert_eq!(state.debit(&holder, &usd, 11), Err(codes::OP_UNDERFUNDED));
        assert_eq!(state.debit(&holder, &usd, 10), Ok(()));
    }

    #[test]
    fn test_native_debit_respects_reserve() {
        let holder = key(1);
        let mut state = LedgerState::default();
        state
            .accounts
            .insert(holder, AccountEntry::new(holder, 3 * BASE_RESERVE, 0));
        assert_eq!(
            state.debit(&holder, &Asset::Native, BASE_RESERVE + 1),
            Err(codes::OP_UNDERFUNDED)
        );
        assert_eq!(state.debit(&holder, &Asset::Native, BASE_RESERVE), Ok(()));
    }
}
