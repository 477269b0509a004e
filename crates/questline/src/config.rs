//! Configuration for the questline binary.
//!
//! Configuration is read from a TOML file, then patched by environment
//! variables. It is converted once into the context values the library
//! crates take in their constructors.
//!
//! # Sections
//!
//! | Section      | Purpose                                   |
//! |--------------|-------------------------------------------|
//! | `network`    | Horizon endpoint, passphrase and friendbot |
//! | `submission` | Fees, validity window, retry schedule     |
//! | `logging`    | Level and output format                   |
//!
//! # Example
//!
//! ```toml
//! secret_key = "S..."
//!
//! [network]
//! name = "testnet"
//! horizon_url = "https://horizon-testnet.stellar.org"
//! passphrase = "Test SDF Network ; September 2015"
//! friendbot_url = "https://friendbot.stellar.org"
//!
//! [submission]
//! base_fee = 100
//! max_attempts = 3
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```
//!
//! # Environment overrides
//!
//! - `QUESTLINE_NETWORK`: `PUBLIC` switches to the mainnet preset, anything
//!   else to testnet
//! - `QUESTLINE_SECRET_KEY`
//! - `QUESTLINE_HORIZON_URL`
//! - `QUESTLINE_NETWORK_PASSPHRASE`
//! - `QUESTLINE_BASE_FEE`
//! - `QUESTLINE_LOG_LEVEL`
//! - `QUESTLINE_LOG_FORMAT`

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use questline_client::horizon::DEFAULT_HTTP_TIMEOUT;
use questline_client::HorizonConfig;
use questline_common::network::{MAINNET_PASSPHRASE, TESTNET_PASSPHRASE};
use questline_common::NetworkContext;
use questline_crypto::SecretKey;
use questline_flows::{FlowConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogFormat};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Key that sources flows. Generated and funded per run when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    pub network: NetworkConfig,
    pub submission: SubmissionConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Free-form label used in logs.
    pub name: String,
    pub passphrase: String,
    pub horizon_url: String,
    /// Only test networks have one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendbot_url: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from_context("testnet", NetworkContext::testnet())
    }
}

impl NetworkConfig {
    fn from_context(name: &str, ctx: NetworkContext) -> Self {
        Self {
            name: name.to_string(),
            passphrase: ctx.passphrase,
            horizon_url: ctx.endpoint,
            friendbot_url: ctx.friendbot_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Stroops per operation.
    pub base_fee: u32,
    /// Ledger-side validity window of each transaction.
    pub tx_timeout_secs: u64,
    pub http_timeout_secs: u64,
    /// Submission attempts per step, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Oldest account snapshot a transaction may be built from.
    pub max_snapshot_age_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        let flow = FlowConfig::default();
        Self {
            base_fee: flow.base_fee,
            tx_timeout_secs: flow.tx_timeout.as_secs(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            max_attempts: flow.retry.max_attempts,
            initial_backoff_ms: flow.retry.initial_backoff.as_millis() as u64,
            max_backoff_ms: flow.retry.max_backoff.as_millis() as u64,
            max_snapshot_age_secs: flow.max_snapshot_age.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_colors")]
    pub colors: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_colors() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colors: default_colors(),
        }
    }
}

impl AppConfig {
    pub fn testnet() -> Self {
        Self {
            secret_key: None,
            network: NetworkConfig::from_context("testnet", NetworkContext::testnet()),
            submission: SubmissionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn mainnet() -> Self {
        Self {
            secret_key: None,
            network: NetworkConfig::from_context("mainnet", NetworkContext::mainnet()),
            submission: SubmissionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, applies environment overrides, then validates.
    pub fn from_file_with_env(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. `QUESTLINE_NETWORK` resets the
    /// network section before the finer-grained keys apply.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(network) = lookup("QUESTLINE_NETWORK") {
            self.network = if network.eq_ignore_ascii_case("PUBLIC") {
                NetworkConfig::from_context("mainnet", NetworkContext::mainnet())
            } else {
                NetworkConfig::from_context("testnet", NetworkContext::testnet())
            };
        }
        if let Some(secret) = lookup("QUESTLINE_SECRET_KEY") {
            self.secret_key = Some(secret);
        }
        if let Some(url) = lookup("QUESTLINE_HORIZON_URL") {
            self.network.horizon_url = url;
        }
        if let Some(passphrase) = lookup("QUESTLINE_NETWORK_PASSPHRASE") {
            self.network.passphrase = passphrase;
        }
        if let Some(fee) = lookup("QUESTLINE_BASE_FEE").and_then(|v| v.parse().ok()) {
            self.submission.base_fee = fee;
        }
        if let Some(level) = lookup("QUESTLINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("QUESTLINE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.horizon_url.is_empty() {
            anyhow::bail!("network.horizon_url must be set");
        }
        if self.network.passphrase.is_empty() {
            anyhow::bail!("network.passphrase must be set");
        }
        if self.network.passphrase == MAINNET_PASSPHRASE && self.network.friendbot_url.is_some() {
            anyhow::bail!("mainnet has no friendbot; remove network.friendbot_url");
        }
        if self.submission.base_fee < questline_tx::BASE_FEE {
            anyhow::bail!(
                "submission.base_fee must be at least {} stroops",
                questline_tx::BASE_FEE
            );
        }
        if self.submission.max_attempts == 0 {
            anyhow::bail!("submission.max_attempts must be at least 1");
        }
        if self.submission.tx_timeout_secs == 0 {
            anyhow::bail!("submission.tx_timeout_secs must be positive");
        }
        if self.submission.initial_backoff_ms > self.submission.max_backoff_ms {
            anyhow::bail!("submission.initial_backoff_ms exceeds submission.max_backoff_ms");
        }
        self.logging.format.parse::<LogFormat>()?;
        if let Some(secret) = &self.secret_key {
            SecretKey::from_strkey(secret).context("secret_key is not a valid secret seed")?;
        }
        Ok(())
    }

    /// A sample configuration, for `questline sample-config`.
    pub fn sample_config() -> String {
        let body = toml::to_string_pretty(&Self::testnet()).unwrap_or_default();
        format!(
            "# questline configuration\n\
             #\n\
             # secret_key = \"S...\"   # flows source key; generated and funded when absent\n\
             #\n\
             # Set network.passphrase to \"{}\" together with the\n\
             # mainnet Horizon URL to target the public network.\n\n{}",
            MAINNET_PASSPHRASE, body
        )
    }

    pub fn is_testnet(&self) -> bool {
        self.network.passphrase == TESTNET_PASSPHRASE
    }

    pub fn network_context(&self) -> NetworkContext {
        let ctx = NetworkContext::new(&self.network.horizon_url, &self.network.passphrase);
        match &self.network.friendbot_url {
            Some(url) => ctx.with_friendbot(url),
            None => ctx,
        }
    }

    pub fn horizon_config(&self) -> HorizonConfig {
        HorizonConfig::from_network(&self.network_context())
            .with_timeout(Duration::from_secs(self.submission.http_timeout_secs))
    }

    pub fn flow_config(&self) -> FlowConfig {
        let s = &self.submission;
        FlowConfig {
            base_fee: s.base_fee,
            tx_timeout: Duration::from_secs(s.tx_timeout_secs),
            max_snapshot_age: Duration::from_secs(s.max_snapshot_age_secs),
            retry: RetryPolicy {
                max_attempts: s.max_attempts,
                initial_backoff: Duration::from_millis(s.initial_backoff_ms),
                max_backoff: Duration::from_millis(s.max_backoff_ms),
            },
        }
    }

    pub fn log_config(&self) -> anyhow::Result<LogConfig> {
        Ok(LogConfig {
            format: self.logging.format.parse()?,
            ansi_colors: self.logging.colors,
            ..LogConfig::default()
        }
        .with_level(&self.logging.level))
    }

    pub fn secret_key(&self) -> anyhow::Result<Option<SecretKey>> {
        self.secret_key
            .as_deref()
            .map(|s| SecretKey::from_strkey(s).context("secret_key is not a valid secret seed"))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.is_testnet());
        assert!(config.network.friendbot_url.is_some());
        assert_eq!(config.submission.base_fee, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mainnet_config() {
        let config = AppConfig::mainnet();
        assert_eq!(config.network.passphrase, MAINNET_PASSPHRASE);
        assert!(config.network.friendbot_url.is_none());
        assert!(config.validate().is_ok());
        assert_ne!(
            config.network_context().network_id(),
            AppConfig::testnet().network_context().network_id()
        );
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[submission]\nbase_fee = 250\nmax_attempts = 5\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.submission.base_fee, 250);
        assert_eq!(config.flow_config().retry.max_attempts, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.log_config().unwrap().format, LogFormat::Json);
        assert!(config.is_testnet());
    }

    #[test]
    fn test_from_file_rejects_bad_secret() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "secret_key = \"SNOTAKEY\"").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_overrides() {
        let secret = SecretKey::generate().to_strkey();
        let vars: HashMap<&str, String> = [
            ("QUESTLINE_NETWORK", "PUBLIC".to_string()),
            ("QUESTLINE_SECRET_KEY", secret.clone()),
            ("QUESTLINE_BASE_FEE", "400".to_string()),
            ("QUESTLINE_LOG_LEVEL", "debug".to_string()),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::testnet();
        config.apply_overrides(|key| vars.get(key).cloned());

        assert_eq!(config.network.passphrase, MAINNET_PASSPHRASE);
        assert_eq!(config.network.name, "mainnet");
        assert_eq!(config.submission.base_fee, 400);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.secret_key().unwrap().map(|k| k.to_strkey()),
            Some(secret)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_horizon_url_override_applies_after_network() {
        let mut config = AppConfig::mainnet();
        config.apply_overrides(|key| match key {
            "QUESTLINE_NETWORK" => Some("TESTNET".to_string()),
            "QUESTLINE_HORIZON_URL" => Some("http://localhost:8000".to_string()),
            _ => None,
        });
        assert!(config.is_testnet());
        assert_eq!(config.network_context().endpoint, "http://localhost:8000");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::testnet();
        config.submission.base_fee = 10;
        assert!(config.validate().is_err());

        let mut config = AppConfig::testnet();
        config.submission.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::testnet();
        config.logging.format = "yaml".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::mainnet();
        config.network.friendbot_url = Some("https://friendbot.stellar.org".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = AppConfig::sample_config();
        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.network.horizon_url, AppConfig::testnet().network.horizon_url);
    }

    #[test]
    fn test_flow_config_conversion() {
        let mut config = AppConfig::testnet();
        config.submission.initial_backoff_ms = 50;
        config.submission.max_backoff_ms = 400;
        let flow = config.flow_config();
        assert_eq!(flow.retry.backoff(1), Duration::from_millis(50));
        assert_eq!(flow.retry.backoff(10), Duration::from_millis(400));
    }
}
