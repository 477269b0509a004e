//! Account snapshots.
//!
//! An [`Account`] is a read-through copy of ledger state taken immediately
//! before a transaction is built. The ledger owns the real record; the
//! snapshot only remembers when it was taken so the builder can refuse to
//! spend a sequence number that may already be gone.

use questline_crypto::PublicKey;

use crate::asset::Asset;
use crate::operations::ThresholdLevel;
use crate::pool::LiquidityPoolId;

/// Per-level signer weight requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Thresholds {
    pub low: u8,
    pub med: u8,
    pub high: u8,
}

impl Thresholds {
    pub fn new(low: u8, med: u8, high: u8) -> Self {
        Self { low, med, high }
    }

    pub fn for_level(&self, level: ThresholdLevel) -> u8 {
        match level {
            ThresholdLevel::Low => self.low,
            ThresholdLevel::Medium => self.med,
            ThresholdLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    pub key: PublicKey,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BalanceLine {
    Native,
    Credit(Asset),
    PoolShare(LiquidityPoolId),
}

impl std::fmt::Display for BalanceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceLine::Native => f.write_str("native"),
            BalanceLine::Credit(asset) => write!(f, "{}", asset),
            BalanceLine::PoolShare(id) => write!(f, "pool:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub line: BalanceLine,
    /// Stroops.
    pub amount: i64,
    /// `None` for the native balance.
    pub limit: Option<i64>,
    pub authorized: bool,
    pub clawback_enabled: bool,
}

impl Balance {
    pub fn native(amount: i64) -> Self {
        Self {
            line: BalanceLine::Native,
            amount,
            limit: None,
            authorized: true,
            clawback_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: PublicKey,
    sequence: i64,
    master_weight: u8,
    thresholds: Thresholds,
    signers: Vec<Signer>,
    balances: Vec<Balance>,
    flags: u32,
    home_domain: Option<String>,
    /// Unix seconds at which the snapshot was read, `None` if never loaded.
    loaded_at: Option<u64>,
}

impl Account {
    /// A snapshot read from the ledger at `loaded_at`.
    pub fn loaded(id: PublicKey, sequence: i64, loaded_at: u64) -> Self {
        Self {
            loaded_at: Some(loaded_at),
            ..Self::offline(id, sequence)
        }
    }

    /// A snapshot that did not come from the ledger. The builder refuses it
    /// until [`Account::assume_fresh`] is called.
    pub fn offline(id: PublicKey, sequence: i64) -> Self {
        Self {
            id,
            sequence,
            master_weight: 1,
            thresholds: Thresholds::default(),
            signers: Vec::new(),
            balances: Vec::new(),
            flags: 0,
            home_domain: None,
            loaded_at: None,
        }
    }

    /// Marks an offline snapshot as trusted at `now`.
    pub fn assume_fresh(mut self, now: u64) -> Self {
        self.loaded_at = Some(now);
        self
    }

    pub fn with_master_weight(mut self, weight: u8) -> Self {
        self.master_weight = weight;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Signers are kept sorted by key.
    pub fn with_signers(mut self, mut signers: Vec<Signer>) -> Self {
        signers.sort_by(|a, b| a.key.cmp(&b.key));
        signers.dedup_by(|a, b| a.key == b.key);
        self.signers = signers;
        self
    }

    pub fn with_balances(mut self, balances: Vec<Balance>) -> Self {
        self.balances = balances;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_home_domain(mut self, domain: Option<String>) -> Self {
        self.home_domain = domain;
        self
    }

    pub fn id(&self) -> &PublicKey {
        &self.id
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// The sequence number the next transaction from this account must carry.
    pub fn next_sequence(&self) -> Option<i64> {
        self.sequence.checked_add(1)
    }

    pub fn master_weight(&self) -> u8 {
        self.master_weight
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn home_domain(&self) -> Option<&str> {
        self.home_domain.as_deref()
    }

    pub fn loaded_at(&self) -> Option<u64> {
        self.loaded_at
    }

    /// True if loaded no more than `max_age_secs` before `now`.
    pub fn is_fresh(&self, now: u64, max_age_secs: u64) -> bool {
        match self.loaded_at {
            Some(at) => now.saturating_sub(at) <= max_age_secs,
            None => false,
        }
    }

    /// Weight of `key` on this account, counting the master key.
    pub fn weight_of(&self, key: &PublicKey) -> u8 {
        if key == &self.id {
            return self.master_weight;
        }
        self.signers
            .iter()
            .find(|s| &s.key == key)
            .map(|s| s.weight)
            .unwrap_or(0)
    }

    /// Sum of all signer weights including the master key.
    pub fn total_weight(&self) -> u32 {
        self.signers
            .iter()
            .map(|s| s.weight as u32)
            .sum::<u32>()
            + self.master_weight as u32
    }

    pub fn native_balance(&self) -> i64 {
        self.balances
            .iter()
            .find(|b| b.line == BalanceLine::Native)
            .map(|b| b.amount)
            .unwrap_or(0)
    }

    pub fn balance(&self, asset: &Asset) -> Option<&Balance> {
        let line = match asset {
            Asset::Native => BalanceLine::Native,
            credit => BalanceLine::Credit(credit.clone()),
        };
        self.balances.iter().find(|b| b.line == line)
    }

    pub fn pool_shares(&self, pool: &LiquidityPoolId) -> Option<&Balance> {
        self.balances
            .iter()
            .find(|b| b.line == BalanceLine::PoolShare(*pool))
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
    fn test_offline_snapshot_is_not_fresh() {
        let account = Account::offline(key(1), 10);
        assert!(!account.is_fresh(100, 60));
        let account = account.assume_fresh(100);
        assert!(account.is_fresh(100, 60));
        assert!(account.is_fresh(160, 60));
        assert!(!account.is_fresh(161, 60));
    }

    #[test]
    fn test_next_sequence() {
        assert_eq!(Account::loaded(key(1), 41, 0).next_sequence(), Some(42));
        assert_eq!(Account::loaded(key(1), i64::MAX, 0).next_sequence(), None);
    }

    #[test]
    fn test_weights() {
        let account = Account::loaded(key(1), 1, 0)
            .with_master_weight(1)
            .with_signers(vec![
                Signer { key: key(2), weight: 2 },
                Signer { key: key(3), weight: 2 },
            ]);
        assert_eq!(account.weight_of(&key(1)), 1);
        assert_eq!(account.weight_of(&key(2)), 2);
        assert_eq!(account.weight_of(&key(9)), 0);
        assert_eq!(account.total_weight(), 5);
    }

    #[test]
    fn test_balance_lookup() {
        let usdc = Asset::credit("USDC", key(5)).unwrap();
        let account = Account::loaded(key(1), 1, 0).with_balances(vec![
            Balance::native(100),
            Balance {
                line: BalanceLine::Credit(usdc.clone()),
                amount: 7,
                limit: Some(1_000),
                authorized: true,
                clawback_enabled: false,
            },
        ]);
        assert_eq!(account.native_balance(), 100);
        assert_eq!(account.balance(&usdc).map(|b| b.amount), Some(7));
        assert_eq!(account.balance(&Asset::Native).map(|b| b.amount), Some(100));
    }
}
