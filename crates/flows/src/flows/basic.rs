//! Single-transaction flows: account creation, payments, trustlines,
//! merges, data entries and home domains.

use async_trait::async_trait;
use questline_common::STROOPS_PER_UNIT;
use questline_crypto::{PublicKey, SecretKey};
use questline_tx::{Asset, Operation};

use crate::error::Result;
use crate::orchestrator::{Flow, FlowRun, Step};

/// Starting balance of accounts made by [`CreateAccountFlow`]: 1000 XLM.
pub const DEFAULT_STARTING_BALANCE: i64 = 1000 * STROOPS_PER_UNIT;

/// Funds a new account out of an existing one.
#[derive(Debug, Clone)]
pub struct CreateAccountFlow {
    pub funder: SecretKey,
    pub new_account: SecretKey,
    pub starting_balance: i64,
}

impl CreateAccountFlow {
    /// Creates a freshly generated keypair with the default balance.
    pub fn new(funder: SecretKey) -> Self {
        Self {
            funder,
            new_account: SecretKey::generate(),
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }

    pub fn with_account(mut self, key: SecretKey) -> Self {
        self.new_account = key;
        self
    }

    pub fn with_starting_balance(mut self, stroops: i64) -> Self {
        self.starting_balance = stroops;
        self
    }
}

#[async_trait]
impl Flow for CreateAccountFlow {
    type Output = PublicKey;

    fn name(&self) -> &str {
        "create-account"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<PublicKey> {
        let destination = self.new_account.public_key();
        run.submit(Step::new(
            "create",
            &self.funder,
            vec![Operation::create_account(destination, self.starting_balance)],
        ))
        .await?;
        Ok(destination)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentFlow {
    pub from: SecretKey,
    pub to: PublicKey,
    pub asset: Asset,
    pub amount: i64,
}

#[async_trait]
impl Flow for PaymentFlow {
    type Output = ();

    fn name(&self) -> &str {
        "payment"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        run.submit(Step::new(
            "pay",
            &self.from,
            vec![Operation::payment(self.to, self.asset.clone(), self.amount)],
        ))
        .await?;
        Ok(())
    }
}

/// Opens (or resizes) a trustline. Without a limit the line is unbounded.
#[derive(Debug, Clone)]
pub struct ChangeTrustFlow {
    pub account: SecretKey,
    pub asset: Asset,
    pub limit: Option<i64>,
}

#[async_trait]
impl Flow for ChangeTrustFlow {
    type Output = ();

    fn name(&self) -> &str {
        "change-trust"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        let limit = self.limit.unwrap_or(i64::MAX);
        run.submit(Step::new(
            "trust",
            &self.account,
            vec![Operation::change_trust(self.asset.clone(), limit)],
        ))
        .await?;
        Ok(())
    }
}

/// Merges `source` into `destination`; `source` ceases to exist.
#[derive(Debug, Clone)]
pub struct AccountMergeFlow {
    pub source: SecretKey,
    pub destination: PublicKey,
}

#[async_trait]
impl Flow for AccountMergeFlow {
    type Output = ();

    fn name(&self) -> &str {
        "account-merge"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        run.submit(Step::new(
            "merge",
            &self.source,
            vec![Operation::account_merge(self.destination)],
        ))
        .await?;
        Ok(())
    }
}

/// Writes `Hello` twice in one transaction; the second value wins.
#[derive(Debug, Clone)]
pub struct ManageDataFlow {
    pub account: SecretKey,
}

impl ManageDataFlow {
    pub const KEY: &'static str = "Hello";
    pub const FIRST: &'static [u8] = b"World";
    pub const SECOND: &'static [u8] = b"Stellar Quest!";
}

#[async_trait]
impl Flow for ManageDataFlow {
    type Output = ();

    fn name(&self) -> &str {
        "manage-data"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        run.submit(Step::new(
            "write",
            &self.account,
            vec![
                Operation::manage_data(Self::KEY, Some(Self::FIRST.to_vec())),
                Operation::manage_data(Self::KEY, Some(Self::SECOND.to_vec())),
            ],
        ))
        .await?;
        Ok(())
    }
}

/// Sets the account's home domain (at most 32 bytes).
#[derive(Debug, Clone)]
pub struct HomeDomainFlow {
    pub account: SecretKey,
    pub domain: String,
}

#[async_trait]
impl Flow for HomeDomainFlow {
    type Output = ();

    fn name(&self) -> &str {
        "home-domain"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        run.submit(Step::new(
            "set-home-domain",
            &self.account,
            vec![Operation::set_home_domain(self.domain.clone())],
        ))
        .await?;
        Ok(())
    }
}
