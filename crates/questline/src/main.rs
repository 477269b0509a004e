//! questline - ledger transaction flows from the command line
//!
//! Runs the flows in [`questline_flows`] against Horizon, or against an
//! in-process sandbox ledger.
//!
//! # Quick Start
//!
//! ```bash
//! # Try a flow without touching any network
//! questline --sandbox flow claimable-balance
//!
//! # Pay a friendbot-funded account on testnet
//! QUESTLINE_SECRET_KEY=S... questline flow payment --amount 10
//!
//! # Inspect an account
//! questline account G...
//! ```
//!
//! # Configuration
//!
//! Configuration can be provided via:
//! - A TOML configuration file (`--config <FILE>`)
//! - Built-in network defaults (`--testnet` or `--mainnet`)
//! - Environment variables (prefixed with `QUESTLINE_`)
//!
//! See `questline sample-config` for an example configuration.
//!
//! When no secret key is configured, each run generates one and funds it
//! through friendbot, so testnet and the sandbox work with no setup.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use questline_client::{
    FriendbotFunder, Funder, HorizonClient, LedgerClient, LedgerError, TransactionStatus,
};
use questline_common::{format_amount, parse_amount, Clock, Hash256, Price, SystemClock};
use questline_crypto::{PublicKey, SecretKey};
use questline_flows::flows::{
    AccountMergeFlow, AssetIssuanceFlow, ChangeTrustFlow, ClaimFlow, ClaimableBalanceFlow,
    ClawbackFlow, CreateAccountFlow, FeeBumpFlow, HomeDomainFlow, LiquidityPoolFlow,
    ManageDataFlow, MultisigPaymentFlow, MultisigThresholdFlow, OfferKind, PaymentFlow,
    SequenceBumpFlow, SponsoredAccountCreation, DEFAULT_BUMP, DEFAULT_CLAIM_DELAY_SECS,
};
use questline_flows::{Flow, FlowOrchestrator, FlowReport};
use questline_sandbox::SandboxLedger;
use questline_tx::{Asset, ClaimableBalanceId};

use crate::config::AppConfig;
use crate::logging::{LogConfig, LogFormat};

/// Build, sign and submit ledger transaction flows
#[derive(Parser)]
#[command(name = "questline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Log output format (defaults to the configured one)
    #[arg(long, global = true)]
    log_format: Option<CliLogFormat>,

    /// Use testnet configuration (default)
    #[arg(long, global = true)]
    testnet: bool,

    /// Use mainnet configuration
    #[arg(long, global = true, conflicts_with = "testnet")]
    mainnet: bool,

    /// Run against an in-process sandbox ledger instead of Horizon
    #[arg(long, global = true)]
    sandbox: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Log output format for CLI
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliLogFormat {
    Text,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Generate a new keypair
    NewKeypair,

    /// Fund accounts through friendbot
    Fund {
        /// Account ids (G...)
        #[arg(required = true)]
        accounts: Vec<String>,
    },

    /// Print an account's sequence number, balances and signers
    Account {
        /// Account id (G...)
        account: String,
    },

    /// Look a transaction up by hash
    Status {
        /// Transaction hash, hex
        hash: String,
    },

    /// Print sample configuration
    SampleConfig,

    /// Run a flow
    #[command(subcommand)]
    Flow(FlowCommand),
}

/// Flows. Amounts are decimal units, e.g. `12.5`.
#[derive(Subcommand)]
enum FlowCommand {
    /// Create and fund a new account
    CreateAccount {
        #[arg(long, default_value = "1000")]
        balance: String,
    },

    /// Send a payment
    Payment {
        /// Recipient; a fresh funded account when omitted
        #[arg(long)]
        to: Option<String>,
        /// `native` or CODE:ISSUER
        #[arg(long, default_value = "native")]
        asset: String,
        #[arg(long, default_value = "100")]
        amount: String,
    },

    /// Add or update a trustline
    Trust {
        /// CODE:ISSUER
        #[arg(long)]
        asset: String,
        /// Defaults to the maximum
        #[arg(long)]
        limit: Option<String>,
    },

    /// Merge the configured account into another
    Merge {
        /// Destination; a fresh funded account when omitted
        #[arg(long)]
        into: Option<String>,
    },

    /// Write a data entry twice in one transaction
    ManageData,

    /// Set the account's home domain
    HomeDomain {
        #[arg(long)]
        domain: String,
    },

    /// Create an account whose reserve the configured account sponsors
    SponsoredAccount,

    /// Escrow a claimable balance for another account
    ClaimableBalance {
        /// Claimant; a fresh funded account when omitted
        #[arg(long)]
        claimant: Option<String>,
        #[arg(long, default_value = "100")]
        amount: String,
        /// Seconds before the claimant may claim
        #[arg(long, default_value_t = DEFAULT_CLAIM_DELAY_SECS)]
        delay: i64,
    },

    /// Claim a claimable balance as the configured account
    Claim {
        /// Balance id, hex
        #[arg(long)]
        balance_id: String,
    },

    /// Issue a clawback-enabled asset to a fresh holder, then claw some back
    Clawback,

    /// Add two signers with thresholds, then pay with every key
    Multisig,

    /// Deposit into, swap through and withdraw from a liquidity pool
    LiquidityPool {
        #[arg(long, default_value = "QUEST")]
        code: String,
    },

    /// Pay from a fresh account with the configured account covering the fee
    FeeBump,

    /// Bump the sequence number, then submit from the new baseline
    SequenceBump {
        #[arg(long, default_value_t = DEFAULT_BUMP)]
        by: i64,
    },

    /// Trust an asset and offer XLM for it
    Offer {
        /// CODE:ISSUER
        #[arg(long)]
        asset: String,
        #[arg(long, default_value = "passive-sell")]
        kind: String,
        /// Asset per XLM, as `n/d` or decimal
        #[arg(long, default_value = "1")]
        price: String,
        #[arg(long, default_value = "10")]
        amount: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;

    match cli.command {
        Commands::NewKeypair => cmd_new_keypair(),
        Commands::SampleConfig => cmd_sample_config(),
        Commands::Fund { ref accounts } => {
            let session = Session::connect(&config, &cli).await?;
            cmd_fund(&session, accounts).await
        }
        Commands::Account { ref account } => {
            let session = Session::connect(&config, &cli).await?;
            cmd_account(&session, account).await
        }
        Commands::Status { ref hash } => {
            let session = Session::connect(&config, &cli).await?;
            cmd_status(&session, hash).await
        }
        Commands::Flow(ref flow) => {
            let session = Session::connect(&config, &cli).await?;
            let key = session.main_key(&config).await?;
            cmd_flow(&session, &key, flow).await
        }
    }
}

/// Initialize logging. CLI flags win over the config file.
fn init_logging(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let mut log_config = config.log_config()?;
    if cli.trace {
        log_config = log_config.with_level("trace");
    } else if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    if let Some(format) = cli.log_format {
        log_config.format = format.into();
    }
    if log_config.format == LogFormat::Json {
        log_config = LogConfig {
            ansi_colors: false,
            ..log_config
        };
    }

    logging::init(&log_config)?;

    tracing::debug!(network = %config.network.name, "Logging initialized");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = if let Some(ref config_path) = cli.config {
        AppConfig::from_file_with_env(config_path)?
    } else {
        let mut config = if cli.mainnet {
            AppConfig::mainnet()
        } else {
            AppConfig::testnet()
        };
        config.apply_env_overrides();
        config.validate()?;
        config
    };
    Ok(config)
}

/// Connection to a ledger, real or sandboxed, and the orchestrator over it.
struct Session {
    ledger: Arc<dyn LedgerClient>,
    funder: Option<Arc<dyn Funder>>,
    orchestrator: FlowOrchestrator,
    sandbox: bool,
    json: bool,
}

impl Session {
    async fn connect(config: &AppConfig, cli: &Cli) -> anyhow::Result<Self> {
        let network = config.network_context();
        let network_id = network.network_id();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (ledger, funder): (Arc<dyn LedgerClient>, Option<Arc<dyn Funder>>) = if cli.sandbox {
            tracing::info!("Using sandbox ledger");
            let sandbox = Arc::new(SandboxLedger::new(network_id, clock.clone()));
            (sandbox.clone(), Some(sandbox))
        } else {
            tracing::info!(network = %config.network.name, endpoint = %network.endpoint, "Using Horizon");
            if !config.is_testnet() {
                tracing::warn!("Flows will submit real transactions on a non-test network");
            }
            let client = HorizonClient::new(config.horizon_config(), clock.clone())?;
            let funder = match &network.friendbot_url {
                Some(url) => {
                    let timeout = Duration::from_secs(config.submission.http_timeout_secs);
                    Some(Arc::new(FriendbotFunder::new(url.clone(), timeout)?) as Arc<dyn Funder>)
                }
                None => None,
            };
            (Arc::new(client), funder)
        };

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current step");
                on_signal.cancel();
            }
        });

        let mut orchestrator =
            FlowOrchestrator::new(ledger.clone(), network_id, clock, config.flow_config())
                .with_cancellation(cancel);
        if let Some(funder) = &funder {
            orchestrator = orchestrator.with_funder(funder.clone());
        }

        Ok(Self {
            ledger,
            funder,
            orchestrator,
            sandbox: cli.sandbox,
            json: cli.json,
        })
    }

    /// The configured key, or a generated one when none is set.
    ///
    /// Generated keys are always funded; the sandbox starts empty, so a
    /// configured key is funded there too.
    async fn main_key(&self, config: &AppConfig) -> anyhow::Result<SecretKey> {
        match config.secret_key()? {
            Some(key) => {
                if self.sandbox {
                    self.fund(&key.public_key()).await?;
                }
                Ok(key)
            }
            None => {
                let key = SecretKey::generate();
                tracing::info!(account = %key.public_key(), "No secret key configured, using a generated one");
                self.fund(&key.public_key()).await?;
                Ok(key)
            }
        }
    }

    async fn fund(&self, account: &PublicKey) -> anyhow::Result<()> {
        let funder = self
            .funder
            .as_ref()
            .context("this network has no friendbot; configure a funded secret_key")?;
        funder
            .fund(account)
            .await
            .with_context(|| format!("Failed to fund {}", account))
    }

    /// A freshly generated and funded account.
    async fn fresh_account(&self) -> anyhow::Result<SecretKey> {
        let key = SecretKey::generate();
        self.fund(&key.public_key()).await?;
        Ok(key)
    }

    /// `given` parsed, or a fresh funded account.
    async fn account_or_fresh(&self, given: Option<&str>) -> anyhow::Result<PublicKey> {
        match given {
            Some(s) => parse_account(s),
            None => Ok(self.fresh_account().await?.public_key()),
        }
    }

    /// Runs `flow` and prints its steps. `describe` renders the output.
    async fn run<F: Flow>(
        &self,
        flow: &F,
        describe: impl FnOnce(&F::Output) -> Option<String>,
    ) -> anyhow::Result<FlowReport<F::Output>> {
        match self.orchestrator.run(flow).await {
            Ok(report) => {
                let output = describe(&report.output);
                if self.json {
                    let doc = serde_json::json!({
                        "flow": &report.flow,
                        "status": "completed",
                        "output": output,
                        "steps": report.steps.summaries(),
                    });
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                } else {
                    println!("{} completed", report.flow);
                    for step in &report.steps {
                        println!("  {}", step);
                    }
                    if let Some(output) = output {
                        println!("  => {}", output);
                    }
                }
                Ok(report)
            }
            Err(failure) => {
                let diagnostics = failure.ledger_error().and_then(LedgerError::diagnostics);
                if self.json {
                    let doc = serde_json::json!({
                        "flow": &failure.flow,
                        "status": "failed",
                        "error": {
                            "kind": failure.error.kind(),
                            "message": failure.error.to_string(),
                            "diagnostics": diagnostics,
                        },
                        "completed": failure.completed.summaries(),
                    });
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                } else {
                    println!("{} failed: {}", failure.flow, failure.error);
                    for step in &failure.completed {
                        println!("  {}", step);
                    }
                    if let Some(d) = diagnostics {
                        if !d.extras.is_null() {
                            println!("  extras: {}", d.extras);
                        }
                    }
                }
                Err(failure.into())
            }
        }
    }
}

fn parse_account(s: &str) -> anyhow::Result<PublicKey> {
    PublicKey::from_strkey(s).with_context(|| format!("Invalid account id: {}", s))
}

fn parse_stroops(s: &str) -> anyhow::Result<i64> {
    parse_amount(s).with_context(|| format!("Invalid amount: {}", s))
}

fn parse_asset(s: &str) -> anyhow::Result<Asset> {
    s.parse::<Asset>()
        .with_context(|| format!("Invalid asset: {}", s))
}

/// New keypair command handler.
fn cmd_new_keypair() -> anyhow::Result<()> {
    let secret = SecretKey::generate();

    println!("Public Key: {}", secret.public_key());
    println!("Secret Seed: {}", secret.to_strkey());
    println!();
    println!("Store the secret seed in QUESTLINE_SECRET_KEY or the secret_key config entry.");
    Ok(())
}

/// Sample config command handler.
fn cmd_sample_config() -> anyhow::Result<()> {
    println!("{}", AppConfig::sample_config());
    Ok(())
}

async fn cmd_fund(session: &Session, accounts: &[String]) -> anyhow::Result<()> {
    let ids = accounts
        .iter()
        .map(|s| parse_account(s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if session.funder.is_none() {
        anyhow::bail!("this network has no friendbot");
    }

    let mut failed = 0;
    for (account, result) in session.orchestrator.fund(&ids).await {
        match result {
            Ok(()) => println!("{}: funded", account),
            Err(e) => {
                failed += 1;
                println!("{}: {} ({})", account, e, e.kind());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} account(s) could not be funded", failed, ids.len());
    }
    Ok(())
}

async fn cmd_account(session: &Session, account: &str) -> anyhow::Result<()> {
    let id = parse_account(account)?;
    let account = session.ledger.load_account(&id).await?;

    println!("Account:    {}", account.id());
    println!("Sequence:   {}", account.sequence());
    if let Some(domain) = account.home_domain() {
        println!("Home domain: {}", domain);
    }
    let t = account.thresholds();
    println!(
        "Thresholds: low={} medium={} high={} (master weight {})",
        t.low,
        t.med,
        t.high,
        account.master_weight()
    );
    if account.flags() != 0 {
        println!("Flags:      {:#x}", account.flags());
    }
    println!("Balances:");
    for balance in account.balances() {
        let mut line = format!("  {:<16} {}", format_amount(balance.amount), balance.line);
        if let Some(limit) = balance.limit {
            line.push_str(&format!(" (limit {})", format_amount(limit)));
        }
        if balance.limit.is_some() && !balance.authorized {
            line.push_str(" [unauthorized]");
        }
        println!("{}", line);
    }
    if !account.signers().is_empty() {
        println!("Signers:");
        for signer in account.signers() {
            println!("  {} weight={}", signer.key, signer.weight);
        }
    }
    Ok(())
}

async fn cmd_status(session: &Session, hash: &str) -> anyhow::Result<()> {
    let hash = Hash256::from_hex(hash).with_context(|| format!("Invalid hash: {}", hash))?;
    match session.ledger.transaction_status(&hash).await? {
        TransactionStatus::Success { ledger } => println!("{}: success in ledger {}", hash, ledger),
        TransactionStatus::Failed(e) => println!("{}: failed ({}): {}", hash, e.kind(), e),
        TransactionStatus::NotFound => println!("{}: not found", hash),
    }
    Ok(())
}

async fn cmd_flow(session: &Session, key: &SecretKey, command: &FlowCommand) -> anyhow::Result<()> {
    match command {
        FlowCommand::CreateAccount { balance } => {
            let flow = CreateAccountFlow::new(key.clone()).with_starting_balance(parse_stroops(balance)?);
            let secret = flow.new_account.to_strkey();
            session
                .run(&flow, |id| Some(format!("created {} (secret {})", id, secret)))
                .await?;
        }
        FlowCommand::Payment { to, asset, amount } => {
            let flow = PaymentFlow {
                from: key.clone(),
                to: session.account_or_fresh(to.as_deref()).await?,
                asset: parse_asset(asset)?,
                amount: parse_stroops(amount)?,
            };
            session.run(&flow, |_| None).await?;
        }
        FlowCommand::Trust { asset, limit } => {
            let flow = ChangeTrustFlow {
                account: key.clone(),
                asset: parse_asset(asset)?,
                limit: limit.as_deref().map(parse_stroops).transpose()?,
            };
            session.run(&flow, |_| None).await?;
        }
        FlowCommand::Merge { into } => {
            let flow = AccountMergeFlow {
                source: key.clone(),
                destination: session.account_or_fresh(into.as_deref()).await?,
            };
            let destination = flow.destination;
            session
                .run(&flow, |_| Some(format!("merged into {}", destination)))
                .await?;
        }
        FlowCommand::ManageData => {
            let flow = ManageDataFlow { account: key.clone() };
            session.run(&flow, |_| None).await?;
        }
        FlowCommand::HomeDomain { domain } => {
            let flow = HomeDomainFlow {
                account: key.clone(),
                domain: domain.clone(),
            };
            session.run(&flow, |_| None).await?;
        }
        FlowCommand::SponsoredAccount => {
            let flow = SponsoredAccountCreation {
                sponsor: key.clone(),
                new_account: SecretKey::generate(),
            };
            let secret = flow.new_account.to_strkey();
            session
                .run(&flow, |id| Some(format!("sponsored {} (secret {})", id, secret)))
                .await?;
        }
        FlowCommand::ClaimableBalance {
            claimant,
            amount,
            delay,
        } => {
            let mut flow = ClaimableBalanceFlow::new(
                key.clone(),
                session.account_or_fresh(claimant.as_deref()).await?,
                Asset::Native,
                parse_stroops(amount)?,
            );
            flow.claim_delay_secs = *delay;
            session
                .run(&flow, |id| Some(format!("balance id {}", id)))
                .await?;
        }
        FlowCommand::Claim { balance_id } => {
            let flow = ClaimFlow {
                claimant: key.clone(),
                balance_id: ClaimableBalanceId::from_hex(balance_id)
                    .with_context(|| format!("Invalid balance id: {}", balance_id))?,
            };
            session.run(&flow, |_| None).await?;
        }
        FlowCommand::Clawback => {
            let flow = ClawbackFlow::new(key.clone(), session.fresh_account().await?);
            let holder = flow.holder.public_key();
            session
                .run(&flow, |_| Some(format!("holder {}", holder)))
                .await?;
        }
        FlowCommand::Multisig => {
            let cosigners = vec![SecretKey::generate(), SecretKey::generate()];
            let setup = MultisigThresholdFlow::new(
                key.clone(),
                cosigners[0].public_key(),
                cosigners[1].public_key(),
            );
            let seeds: Vec<String> = cosigners.iter().map(SecretKey::to_strkey).collect();
            session
                .run(&setup, |_| Some(format!("cosigner secrets {}", seeds.join(", "))))
                .await?;

            let payment = MultisigPaymentFlow {
                account: key.clone(),
                cosigners,
                destination: session.fresh_account().await?.public_key(),
                asset: Asset::Native,
                amount: parse_stroops("10")?,
            };
            session.run(&payment, |_| None).await?;
        }
        FlowCommand::LiquidityPool { code } => {
            let flow = LiquidityPoolFlow::new(session.fresh_account().await?, key.clone(), code.clone());
            session
                .run(&flow, |id| Some(format!("pool {}", id)))
                .await?;
        }
        FlowCommand::FeeBump => {
            let flow = FeeBumpFlow::new(session.fresh_account().await?, key.clone(), key.public_key());
            session
                .run(&flow, |hash| Some(format!("inner hash {}", hash)))
                .await?;
        }
        FlowCommand::SequenceBump { by } => {
            let flow = SequenceBumpFlow {
                account: key.clone(),
                bump_by: *by,
            };
            session
                .run(&flow, |seq| Some(format!("follow-up used sequence {}", seq)))
                .await?;
        }
        FlowCommand::Offer {
            asset,
            kind,
            price,
            amount,
        } => {
            let flow = AssetIssuanceFlow {
                trader: key.clone(),
                asset: parse_asset(asset)?,
                kind: kind.parse::<OfferKind>()?,
                price: price
                    .parse::<Price>()
                    .with_context(|| format!("Invalid price: {}", price))?,
                amount: parse_stroops(amount)?,
            };
            session.run(&flow, |_| None).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flow_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "questline",
            "--sandbox",
            "flow",
            "offer",
            "--asset",
            "USDC:GBBD47IF6LWK7P7MDEVSCWR7DPUWV3NY3DTQEVFL4NAT4AQH3ZLLFLA5",
            "--kind",
            "buy",
        ])
        .unwrap();
        assert!(cli.sandbox);
        match cli.command {
            Commands::Flow(FlowCommand::Offer { kind, price, .. }) => {
                assert_eq!(kind, "buy");
                assert_eq!(price, "1");
            }
            _ => panic!("expected offer"),
        }
    }

    #[test]
    fn test_manage_data_help_matches_flow() {
        let cmd = Cli::command();
        let flow = cmd.find_subcommand("flow").unwrap();
        let about = flow
            .find_subcommand("manage-data")
            .and_then(|c| c.get_about())
            .map(|a| a.to_string())
            .unwrap();
        assert_eq!(about, "Write a data entry twice in one transaction");
        assert_eq!(ManageDataFlow::KEY, "Hello");
    }

    #[test]
    fn test_mainnet_conflicts_with_testnet() {
        assert!(Cli::try_parse_from(["questline", "--mainnet", "--testnet", "new-keypair"]).is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_stroops("1.5").unwrap(), 15_000_000);
        assert!(parse_stroops("abc").is_err());
        assert!(parse_account("GNOPE").is_err());
        assert!(parse_asset("native").unwrap().is_native());
    }

    #[tokio::test]
    async fn test_sandbox_flow_end_to_end() {
        let config = AppConfig::testnet();
        let cli = Cli::try_parse_from(["questline", "--sandbox", "flow", "manage-data"]).unwrap();
        let session = Session::connect(&config, &cli).await.unwrap();
        let key = session.main_key(&config).await.unwrap();

        let report = session
            .run(&ManageDataFlow { account: key.clone() }, |_| None)
            .await
            .unwrap();
        assert!(!report.steps.is_empty());

        let account = session.ledger.load_account(&key.public_key()).await.unwrap();
        assert!(account.sequence() > 0);
    }

    #[tokio::test]
    async fn test_sandbox_failure_surfaces_error() {
        let config = AppConfig::testnet();
        let cli = Cli::try_parse_from(["questline", "--sandbox", "flow", "manage-data"]).unwrap();
        let session = Session::connect(&config, &cli).await.unwrap();
        let key = session.main_key(&config).await.unwrap();

        let flow = HomeDomainFlow {
            account: key,
            domain: "x".repeat(40),
        };
        assert!(session.run(&flow, |_| None).await.is_err());
    }
}
