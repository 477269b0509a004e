//! Funding side-channel for test networks.
//!
//! Funding is best effort: an account may already exist, and a failed
//! funding call is logged and reported per account without aborting the
//! caller.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use questline_crypto::PublicKey;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};

/// Provisions test accounts out of band.
#[async_trait]
pub trait Funder: Send + Sync {
    async fn fund(&self, account: &PublicKey) -> Result<()>;

    /// Funds every account concurrently and reports each outcome.
    async fn fund_all(&self, accounts: &[PublicKey]) -> Vec<(PublicKey, Result<()>)> {
        let results = join_all(accounts.iter().map(|a| self.fund(a))).await;
        accounts
            .iter()
            .copied()
            .zip(results)
            .inspect(|(account, result)| {
                if let Err(e) = result {
                    warn!(account = %account, error = %e, "Funding failed");
                }
            })
            .collect()
    }
}

/// Friendbot: `GET {url}?addr=G...`.
pub struct FriendbotFunder {
    client: Client,
    url: String,
}

impl FriendbotFunder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Network(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Funder for FriendbotFunder {
    async fn fund(&self, account: &PublicKey) -> Result<()> {
        debug!(account = %account, url = %self.url, "Requesting friendbot funding");
        let response = self
            .client
            .get(&self.url)
            .query(&[("addr", account.to_string())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(account = %account, "Funded account");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            return Err(LedgerError::Network(format!("friendbot HTTP {}", status.as_u16())));
        }
        // Friendbot answers 400 for accounts that already exist.
        Err(LedgerError::Rejected(
            crate::Diagnostics::default().with_extras(
                serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
            ),
        ))
    }
}
