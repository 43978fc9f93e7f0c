// crates/storefront-cli/src/main.rs
// ============================================================================
// Module: Storefront CLI Entry Point
// Description: Command dispatcher for config, verification, and order store tasks.
// Purpose: Operate the checkout pipeline from a terminal.
// Dependencies: clap, storefront-config, storefront-verify, storefront-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The `storefront` binary validates configuration, replays a payment return
//! URL through the verification controller against the configured backend,
//! and inspects or maintains the persisted order identity in a `SQLite`
//! database. Session storage is process-local, so only the persistent copies
//! outlive a command.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use storefront_config::StorefrontConfig;
use storefront_core::AuditSink;
use storefront_core::Clock;
use storefront_core::InMemoryKeyValueStore;
use storefront_core::OrderId;
use storefront_core::RecordingNavigator;
use storefront_core::StoredOrderRecord;
use storefront_core::SystemClock;
use storefront_gateway::HttpOrderVerifier;
use storefront_gateway::ThrottleGateway;
use storefront_store::RedundantOrderStore;
use storefront_store_sqlite::SqliteKeyValueStore;
use storefront_verify::PaymentVerificationController;
use storefront_verify::VerificationState;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "storefront", disable_help_subcommand = true)]
struct Cli {
    /// Config file path (overrides `STOREFRONT_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Verify a payment return URL against the backend.
    Verify(VerifyCommand),
    /// Persisted order identity utilities.
    Order {
        /// Selected order subcommand.
        #[command(subcommand)]
        command: OrderCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a storefront configuration file.
    Validate,
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Full return URL including the query string.
    #[arg(long, value_name = "URL")]
    url: String,
    /// `SQLite` database used to recover the order id when the URL has none.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

/// Order subcommands.
#[derive(Subcommand, Debug)]
enum OrderCommand {
    /// Persist an order identity.
    Store(OrderStoreCommand),
    /// Print the persisted order record.
    Show(OrderDbArgs),
    /// Remove every persisted copy.
    Cleanup(OrderCleanupCommand),
}

/// Shared database argument.
#[derive(Args, Debug)]
struct OrderDbArgs {
    /// `SQLite` database path (defaults to `storage.sqlite_path`).
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

/// Arguments for `order store`.
#[derive(Args, Debug)]
struct OrderStoreCommand {
    /// Database selection.
    #[command(flatten)]
    db: OrderDbArgs,
    /// Storefront order id.
    #[arg(long, value_name = "ID")]
    order_id: String,
    /// Payment gateway order id.
    #[arg(long, value_name = "ID")]
    cf_order_id: Option<String>,
    /// Payment gateway session id.
    #[arg(long, value_name = "ID")]
    payment_session_id: Option<String>,
    /// Order total.
    #[arg(long, value_name = "AMOUNT")]
    amount: Option<f64>,
    /// Payment environment label.
    #[arg(long, value_name = "NAME")]
    environment: Option<String>,
}

/// Arguments for `order cleanup`.
#[derive(Args, Debug)]
struct OrderCleanupCommand {
    /// Database selection.
    #[command(flatten)]
    db: OrderDbArgs,
    /// Re-write the single basic id key after cleanup.
    #[arg(long, action = ArgAction::SetTrue)]
    keep_basic_id: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = StorefrontConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    match cli.command {
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(&config),
        Commands::Verify(command) => command_verify(&config, &command).await,
        Commands::Order {
            command,
        } => command_order(&config, command),
    }
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Reports a valid configuration and its enabled sinks.
fn command_config_validate(config: &StorefrontConfig) -> CliResult<ExitCode> {
    write_line("config ok")?;
    for (kind, id) in config.tracking.enabled_sinks() {
        write_line(&format!("sink {}: {id}", kind.as_str()))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Runs the verification controller against a return URL.
async fn command_verify(config: &StorefrontConfig, command: &VerifyCommand) -> CliResult<ExitCode> {
    let url = Url::parse(&command.url)
        .map_err(|err| CliError::new(format!("invalid return url: {err}")))?;
    let verifier_config = config
        .verify
        .http_verifier_config()
        .map_err(|err| CliError::new(err.to_string()))?
        .ok_or_else(|| CliError::new("verify.base_url is not configured".to_string()))?;
    let verifier = HttpOrderVerifier::new(verifier_config)
        .map_err(|err| CliError::new(format!("verifier setup failed: {err}")))?;
    let audit = build_audit(config)?;
    let navigator = Arc::new(RecordingNavigator::new());
    let gateway =
        ThrottleGateway::with_audit(config.gateway.to_throttle_config(), Arc::clone(&audit));
    let mut controller = PaymentVerificationController::new(Arc::new(verifier), navigator.clone())
        .with_gateway(gateway)
        .with_audit(Arc::clone(&audit))
        .with_config(config.verify.to_verify_config());
    if let Some(db) = &command.db {
        controller = controller.with_store(open_store(config, Some(db), audit)?);
    }

    let state = controller.start(&url).await;
    write_line(&format!("state: {}", state.as_str()))?;
    if let Some(redirect) = navigator.last() {
        write_line(&format!("redirect: {}", redirect.location()))?;
        let state_json = serde_json::to_string(&redirect.state)
            .map_err(|err| CliError::new(format!("failed to encode state: {err}")))?;
        write_line(&format!("state_json: {state_json}"))?;
    }
    Ok(if state == VerificationState::Success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ============================================================================
// SECTION: Order Commands
// ============================================================================

/// Dispatches order subcommands.
fn command_order(config: &StorefrontConfig, command: OrderCommand) -> CliResult<ExitCode> {
    let audit = build_audit(config)?;
    match command {
        OrderCommand::Store(command) => {
            let store = open_store(config, command.db.db.as_deref(), audit)?;
            let order_id = OrderId::parse(&command.order_id)
                .ok_or_else(|| CliError::new("order id must be non-empty".to_string()))?;
            let mut record = StoredOrderRecord::new(order_id, SystemClock.now());
            record.cf_order_id = command.cf_order_id;
            record.payment_session_id = command.payment_session_id;
            record.order_amount = command.amount;
            record.environment = command.environment;
            if !store.store(&record) {
                return Err(CliError::new("no backend accepted the order record".to_string()));
            }
            write_line(&format!("stored order {}", record.order_id.as_str()))?;
            Ok(ExitCode::SUCCESS)
        }
        OrderCommand::Show(args) => {
            let store = open_store(config, args.db.as_deref(), audit)?;
            let Some(record) = store.retrieve() else {
                write_line("no order stored")?;
                return Ok(ExitCode::FAILURE);
            };
            let json = serde_json::to_string_pretty(&record)
                .map_err(|err| CliError::new(format!("failed to encode record: {err}")))?;
            write_line(&json)?;
            Ok(ExitCode::SUCCESS)
        }
        OrderCommand::Cleanup(command) => {
            let store = open_store(config, command.db.db.as_deref(), audit)?;
            if !store.cleanup(command.keep_basic_id) {
                return Err(CliError::new("some order keys could not be removed".to_string()));
            }
            write_line("order storage cleared")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the configured audit sink.
fn build_audit(config: &StorefrontConfig) -> CliResult<Arc<dyn AuditSink>> {
    config.audit.build_sink().map_err(|err| CliError::new(err.to_string()))
}

/// Opens the redundant store over `SQLite` and a process-local session store.
fn open_store(
    config: &StorefrontConfig,
    db: Option<&Path>,
    audit: Arc<dyn AuditSink>,
) -> CliResult<RedundantOrderStore> {
    let sqlite_config = config.storage.sqlite_config(db).ok_or_else(|| {
        CliError::new("pass --db or set storage.sqlite_path in the config".to_string())
    })?;
    let persistent = SqliteKeyValueStore::new(&sqlite_config)
        .map_err(|err| CliError::new(format!("failed to open order database: {err}")))?;
    let session = InMemoryKeyValueStore::new();
    Ok(RedundantOrderStore::new(Arc::new(persistent), Arc::new(session)).with_audit(audit))
}

/// Writes a line to stdout.
fn write_line(message: &str) -> CliResult<()> {
    write_stdout_line(message)
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
