//! Horizon REST implementation of [`LedgerClient`].
//!
//! Three endpoints are used:
//!
//! | Call | Request |
//! |------|---------|
//! | `load_account` | `GET /accounts/{G...}` |
//! | `submit` | `POST /transactions` with form field `tx=<base64 envelope>` |
//! | `transaction_status` | `GET /transactions/{hex hash}` |
//!
//! HTTP 400 problems from `POST /transactions` carry `extras.result_codes`;
//! they are classified into [`LedgerError`] with the whole `extras` object
//! attached. Timeouts, connection failures, and 5xx answers (including
//! Horizon's 504 "timeout" problem) are [`LedgerError::Network`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use questline_common::{parse_amount, Clock, Hash256, NetworkContext};
use questline_crypto::PublicKey;
use questline_tx::operations::{
    AUTH_CLAWBACK_ENABLED_FLAG, AUTH_IMMUTABLE_FLAG, AUTH_REQUIRED_FLAG, AUTH_REVOCABLE_FLAG,
};
use questline_tx::{
    Account, Asset, Balance, BalanceLine, LiquidityPoolId, SignedTransaction, Signer, Thresholds,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use stellar_xdr::curr::{
    InnerTransactionResultResult, Limits, OperationResult, ReadXdr, TransactionResult,
    TransactionResultResult,
};
use tracing::{debug, info, warn};

use crate::codes;
use crate::error::{Diagnostics, LedgerError, Result};
use crate::ledger::{LedgerClient, SubmitResponse, TransactionStatus};

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HorizonConfig {
    /// Base URL, e.g. `https://horizon-testnet.stellar.org`.
    pub endpoint: String,
    /// Client-side timeout for every request.
    pub timeout: Duration,
}

impl HorizonConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn testnet() -> Self {
        Self::from_network(&NetworkContext::testnet())
    }

    pub fn from_network(network: &NetworkContext) -> Self {
        Self::new(network.endpoint.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`LedgerClient`] backed by a Horizon server.
pub struct HorizonClient {
    client: Client,
    base: String,
    clock: Arc<dyn Clock>,
}

impl HorizonClient {
    /// `clock` stamps loaded account snapshots.
    pub fn new(config: HorizonConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LedgerError::Network(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base: config.endpoint.trim_end_matches('/').to_string(),
            clock,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn load_account(&self, id: &PublicKey) -> Result<Account> {
        let url = self.url(&format!("accounts/{}", id));
        debug!(account = %id, url = %url, "Loading account");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LedgerError::AccountNotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(http_failure(status, response.text().await.unwrap_or_default()));
        }

        let body: AccountResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(format!("account {}: {}", id, e)))?;
        let account = body.into_account(id, self.clock.now_unix())?;
        debug!(
            account = %id,
            sequence = account.sequence(),
            signers = account.signers().len(),
            "Loaded account"
        );
        Ok(account)
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        let envelope = tx.to_base64()?;
        let hash = tx.hash();
        info!(hash = %hash, fee = tx.fee(), "Submitting transaction");

        let response = self
            .client
            .post(self.url("transactions"))
            .form(&[("tx", envelope.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(hash = %hash, error = %e, "Submission transport failure");
                LedgerError::Network(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if status.is_success() {
            let accepted: SubmitBody = serde_json::from_str(&text)
                .map_err(|e| LedgerError::MalformedResponse(format!("submit response: {}", e)))?;
            if accepted.successful == Some(false) {
                let diagnostics = match accepted.result_xdr.as_deref() {
                    Some(xdr) => diagnostics_from_result_xdr(xdr)?,
                    None => Diagnostics::transaction(codes::TX_FAILED),
                };
                return Err(LedgerError::classify(diagnostics));
            }
            let confirmed = Hash256::from_hex(&accepted.hash)
                .map_err(|e| LedgerError::MalformedResponse(format!("hash: {}", e)))?;
            info!(hash = %confirmed, ledger = accepted.ledger, "Transaction accepted");
            return Ok(SubmitResponse {
                hash: confirmed,
                ledger: accepted.ledger,
            });
        }

        if status == StatusCode::BAD_REQUEST {
            let problem: Problem = serde_json::from_str(&text)
                .map_err(|e| LedgerError::MalformedResponse(format!("problem body: {}", e)))?;
            let extras = problem.extras.unwrap_or(serde_json::Value::Null);
            let err = LedgerError::classify(Diagnostics::from_extras(extras));
            warn!(hash = %hash, kind = err.kind(), error = %err, "Transaction rejected");
            return Err(err);
        }

        Err(http_failure(status, text))
    }

    async fn transaction_status(&self, hash: &Hash256) -> Result<TransactionStatus> {
        let url = self.url(&format!("transactions/{}", hash.to_hex()));
        debug!(hash = %hash, "Querying transaction status");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(TransactionStatus::NotFound);
        }
        if !status.is_success() {
            return Err(http_failure(status, response.text().await.unwrap_or_default()));
        }

        let record: TransactionRecord = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(format!("transaction record: {}", e)))?;
        if record.successful {
            return Ok(TransactionStatus::Success {
                ledger: record.ledger,
            });
        }
        let diagnostics = match record.result_xdr.as_deref() {
            Some(xdr) => diagnostics_from_result_xdr(xdr)?,
            None => Diagnostics::transaction(codes::TX_FAILED),
        };
        Ok(TransactionStatus::Failed(LedgerError::classify(diagnostics)))
    }
}

/// Non-400 HTTP failures. Server-side errors leave the outcome unknown.
fn http_failure(status: StatusCode, body: String) -> LedgerError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        LedgerError::Network(format!("HTTP {}", status.as_u16()))
    } else {
        LedgerError::MalformedResponse(format!("HTTP {}: {}", status.as_u16(), body))
    }
}

/// Decodes a base64 `TransactionResult` into result code names.
pub fn diagnostics_from_result_xdr(b64: &str) -> Result<Diagnostics> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| LedgerError::MalformedResponse(format!("result_xdr: {}", e)))?;
    let result = TransactionResult::from_xdr(bytes, Limits::none())
        .map_err(|e| LedgerError::MalformedResponse(format!("result_xdr: {}", e)))?;

    let tx_code = codes::snake_case(result.result.discriminant().name());
    let mut diagnostics = Diagnostics::transaction(&tx_code)
        .with_extras(serde_json::json!({ "result_xdr": b64 }));

    match &result.result {
        TransactionResultResult::TxFailed(ops) | TransactionResultResult::TxSuccess(ops) => {
            diagnostics.operations = ops.iter().map(operation_code).collect();
        }
        TransactionResultResult::TxFeeBumpInnerFailed(pair)
        | TransactionResultResult::TxFeeBumpInnerSuccess(pair) => {
            let inner = &pair.result.result;
            diagnostics.inner_transaction = Some(codes::snake_case(inner.discriminant().name()));
            if let InnerTransactionResultResult::TxFailed(ops)
            | InnerTransactionResultResult::TxSuccess(ops) = inner
            {
                diagnostics.operations = ops.iter().map(operation_code).collect();
            }
        }
        _ => {}
    }
    Ok(diagnostics)
}

fn operation_code(result: &OperationResult) -> String {
    match result {
        OperationResult::OpInner(tr) => {
            let name = inner_result_name(tr);
            format!("op_{}", codes::snake_case(name))
        }
        other => codes::snake_case(other.name()),
    }
}

fn inner_result_name(tr: &stellar_xdr::curr::OperationResultTr) -> &'static str {
    use stellar_xdr::curr::OperationResultTr as Tr;
    match tr {
        Tr::CreateAccount(r) => r.name(),
        Tr::Payment(r) => r.name(),
        Tr::PathPaymentStrictReceive(r) => r.name(),
        Tr::ManageSellOffer(r) => r.name(),
        Tr::CreatePassiveSellOffer(r) => r.name(),
        Tr::SetOptions(r) => r.name(),
        Tr::ChangeTrust(r) => r.name(),
        Tr::AllowTrust(r) => r.name(),
        Tr::AccountMerge(r) => r.name(),
        Tr::Inflation(r) => r.name(),
        Tr::ManageData(r) => r.name(),
        Tr::BumpSequence(r) => r.name(),
        Tr::ManageBuyOffer(r) => r.name(),
        Tr::PathPaymentStrictSend(r) => r.name(),
        Tr::CreateClaimableBalance(r) => r.name(),
        Tr::ClaimClaimableBalance(r) => r.name(),
        Tr::BeginSponsoringFutureReserves(r) => r.name(),
        Tr::EndSponsoringFutureReserves(r) => r.name(),
        Tr::RevokeSponsorship(r) => r.name(),
        Tr::Clawback(r) => r.name(),
        Tr::ClawbackClaimableBalance(r) => r.name(),
        Tr::SetTrustLineFlags(r) => r.name(),
        Tr::LiquidityPoolDeposit(r) => r.name(),
        Tr::LiquidityPoolWithdraw(r) => r.name(),
        Tr::InvokeHostFunction(r) => r.name(),
        Tr::ExtendFootprintTtl(r) => r.name(),
        Tr::RestoreFootprint(r) => r.name(),
    }
}

#[derive(Deserialize)]
struct SubmitBody {
    hash: String,
    #[serde(default)]
    ledger: u32,
    #[serde(default)]
    successful: Option<bool>,
    #[serde(default)]
    result_xdr: Option<String>,
}

#[derive(Deserialize)]
struct TransactionRecord {
    successful: bool,
    #[serde(default)]
    ledger: u32,
    #[serde(default)]
    result_xdr: Option<String>,
}

#[derive(Deserialize)]
struct Problem {
    #[serde(default)]
    extras: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct AccountResponse {
    sequence: String,
    #[serde(default)]
    home_domain: Option<String>,
    thresholds: ThresholdsBody,
    flags: FlagsBody,
    #[serde(default)]
    balances: Vec<BalanceBody>,
    #[serde(default)]
    signers: Vec<SignerBody>,
}

#[derive(Deserialize)]
struct ThresholdsBody {
    low_threshold: u8,
    med_threshold: u8,
    high_threshold: u8,
}

#[derive(Deserialize, Default)]
struct FlagsBody {
    #[serde(default)]
    auth_required: bool,
    #[serde(default)]
    auth_revocable: bool,
    #[serde(default)]
    auth_immutable: bool,
    #[serde(default)]
    auth_clawback_enabled: bool,
}

impl FlagsBody {
    fn bits(&self) -> u32 {
        let mut flags = 0;
        if self.auth_required {
            flags |= AUTH_REQUIRED_FLAG;
        }
        if self.auth_revocable {
            flags |= AUTH_REVOCABLE_FLAG;
        }
        if self.auth_immutable {
            flags |= AUTH_IMMUTABLE_FLAG;
        }
        if self.auth_clawback_enabled {
            flags |= AUTH_CLAWBACK_ENABLED_FLAG;
        }
        flags
    }
}

#[derive(Deserialize)]
struct BalanceBody {
    balance: String,
    #[serde(default)]
    limit: Option<String>,
    asset_type: String,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<String>,
    #[serde(default)]
    liquidity_pool_id: Option<String>,
    #[serde(default)]
    is_authorized: Option<bool>,
    #[serde(default)]
    is_clawback_enabled: Option<bool>,
}

#[derive(Deserialize)]
struct SignerBody {
    key: String,
    weight: u8,
    #[serde(rename = "type")]
    kind: String,
}

fn malformed(what: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::MalformedResponse(format!("{}: {}", what, e))
}

impl AccountResponse {
    fn into_account(self, id: &PublicKey, now: u64) -> Result<Account> {
        let sequence: i64 = self.sequence.parse().map_err(|e| malformed("sequence", e))?;

        let mut master_weight = 0;
        let mut signers = Vec::new();
        for signer in self.signers {
            // Pre-auth and hash-x signers cannot be produced by this client.
            if signer.kind != "ed25519_public_key" {
                continue;
            }
            let key = PublicKey::from_strkey(&signer.key).map_err(|e| malformed("signer", e))?;
            if key == *id {
                master_weight = signer.weight;
            } else {
                signers.push(Signer {
                    key,
                    weight: signer.weight,
                });
            }
        }

        let balances = self
            .balances
            .into_iter()
            .map(BalanceBody::into_balance)
            .collect::<Result<Vec<_>>>()?;

        Ok(Account::loaded(*id, sequence, now)
            .with_master_weight(master_weight)
            .with_thresholds(Thresholds::new(
                self.thresholds.low_threshold,
                self.thresholds.med_threshold,
                self.thresholds.high_threshold,
            ))
            .with_signers(signers)
            .with_balances(balances)
            .with_flags(self.flags.bits())
            .with_home_domain(self.home_domain.filter(|d| !d.is_empty())))
    }
}

impl BalanceBody {
    fn into_balance(self) -> Result<Balance> {
        let amount = parse_amount(&self.balance).map_err(|e| malformed("balance", e))?;
        let limit = self
            .limit
            .as_deref()
            .map(parse_amount)
            .transpose()
            .map_err(|e| malformed("limit", e))?;

        let line = match self.asset_type.as_str() {
            "native" => return Ok(Balance::native(amount)),
            "liquidity_pool_shares" => {
                let id = self
                    .liquidity_pool_id
                    .ok_or_else(|| malformed("balance", "pool share without pool id"))?;
                BalanceLine::PoolShare(
                    LiquidityPoolId::from_hex(&id).map_err(|e| malformed("pool id", e))?,
                )
            }
            "credit_alphanum4" | "credit_alphanum12" => {
                let code = self
                    .asset_code
                    .ok_or_else(|| malformed("balance", "credit without code"))?;
                let issuer = self
                    .asset_issuer
                    .ok_or_else(|| malformed("balance", "credit without issuer"))?;
                let issuer =
                    PublicKey::from_strkey(&issuer).map_err(|e| malformed("issuer", e))?;
                BalanceLine::Credit(
                    Asset::credit(&code, issuer).map_err(|e| malformed("asset", e))?,
                )
            }
            other => return Err(malformed("asset_type", other)),
        };

        Ok(Balance {
            line,
            amount,
            limit,
            authorized: self.is_authorized.unwrap_or(true),
            clawback_enabled: self.is_clawback_enabled.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_crypto::SecretKey;
    use serde_json::json;
    use stellar_xdr::curr::{
        OperationResultTr, PaymentResult, TransactionResultExt, VecM, WriteXdr,
    };

    #[test]
    fn test_account_response_parsing() {
        let id = SecretKey::from_seed(&[1u8; 32]).public_key();
        let cosigner = SecretKey::from_seed(&[2u8; 32]).public_key();
        let issuer = SecretKey::from_seed(&[3u8; 32]).public_key();
        let body = json!({
            "id": id.to_string(),
            "sequence": "4294967296",
            "home_domain": "",
            "thresholds": {"low_threshold": 1, "med_threshold": 2, "high_threshold": 3},
            "flags": {"auth_required": true, "auth_revocable": true,
                      "auth_immutable": false, "auth_clawback_enabled": true},
            "balances": [
                {"balance": "100.0000000", "limit": "922337203685.4775807",
                 "asset_type": "credit_alphanum4", "asset_code": "USD",
                 "asset_issuer": issuer.to_string(), "is_authorized": false,
                 "is_clawback_enabled": true},
                {"balance": "9999.9999900", "asset_type": "native"}
            ],
            "signers": [
                {"key": cosigner.to_string(), "weight": 2, "type": "ed25519_public_key"},
                {"key": "XAAA", "weight": 1, "type": "sha256_hash"},
                {"key": id.to_string(), "weight": 1, "type": "ed25519_public_key"}
            ]
        });

        let parsed: AccountResponse = serde_json::from_value(body).unwrap();
        let account = parsed.into_account(&id, 77).unwrap();
        assert_eq!(account.sequence(), 4_294_967_296);
        assert_eq!(account.loaded_at(), Some(77));
        assert_eq!(account.master_weight(), 1);
        assert_eq!(account.signers(), &[Signer { key: cosigner, weight: 2 }]);
        assert_eq!(account.thresholds(), Thresholds::new(1, 2, 3));
        assert_eq!(account.flags(), 0b1011);
        assert_eq!(account.home_domain(), None);
        assert_eq!(account.native_balance(), 99_999_999_900);

        let usd = Asset::credit("USD", issuer).unwrap();
        let line = account.balance(&usd).unwrap();
        assert_eq!(line.amount, 1_000_000_000);
        assert_eq!(line.limit, Some(i64::MAX));
        assert!(!line.authorized);
        assert!(line.clawback_enabled);
    }

    #[test]
    fn test_result_xdr_decoding() {
        let result = TransactionResult {
            fee_charged: 100,
            result: TransactionResultResult::TxFailed(
                VecM::try_from(vec![OperationResult::OpInner(OperationResultTr::Payment(
                    PaymentResult::Underfunded,
                ))])
                .unwrap(),
            ),
            ext: TransactionResultExt::V0,
        };
        let b64 = base64::engine::general_purpose::STANDARD
            .encode(result.to_xdr(Limits::none()).unwrap());

        let diagnostics = diagnostics_from_result_xdr(&b64).unwrap();
        assert_eq!(diagnostics.transaction.as_deref(), Some("tx_failed"));
        assert_eq!(diagnostics.operations, vec!["op_underfunded".to_string()]);
        assert!(matches!(
            LedgerError::classify(diagnostics),
            LedgerError::InsufficientBalance(_)
        ));
    }

    #[test]
    fn test_server_errors_are_network() {
        assert!(http_failure(StatusCode::GATEWAY_TIMEOUT, String::new()).is_retryable());
        assert!(!http_failure(StatusCode::FORBIDDEN, String::new()).is_retryable());
    }
}
