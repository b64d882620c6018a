mod config;
mod dialects;
mod error;
mod logging;
mod runner;
mod stats;
mod store;
mod traits;
mod types;
mod utils;

use chrono::Local;
use clap::Parser;
use config::Config;
use dialects::Dialect;
use error::Result;
use runner::SystemRunner;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use store::LogStore;
use traits::{CommandRunner, DialectAdapter};
use types::{Mode, ServerSelection};

#[derive(Parser, Debug)]
#[command(name = "speedlog")]
#[command(
    about = "Run the installed speedtest binary, keep a CSV history and report JSON",
    long_about = None,
    disable_help_flag = true
)]
struct Cli {
    /// l|log, s|stat, v|version, t|list, or a server id (empty or 0 = auto).
    /// Unknown dash-prefixed tokens land here too and are rejected as server ids.
    #[arg(allow_hyphen_values = true)]
    arg: Option<String>,

    /// Config file (TOML). Defaults to ~/.config/speedlog/config.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Speedtest executable to invoke
    #[arg(long)]
    binary: Option<String>,

    /// CSV log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Give up on the binary after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Delete all stored results
    #[arg(long)]
    delete_log: bool,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // The caller parses stdout as JSON, even for usage errors.
            let message = e.to_string();
            let first = message.lines().next().unwrap_or_default().trim_start_matches("error: ");
            return emit(&json!({ "error": first }));
        }
    };
    logging::init(&cli.log_level);

    let token = cli.arg.clone().unwrap_or_default();
    let payload = match execute(&cli, &token).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{}", e);
            e.to_payload(&token)
        }
    };

    emit(&payload)
}

fn emit(payload: &Value) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", payload)?;
    stdout.flush()?;
    Ok(())
}

async fn execute(cli: &Cli, token: &str) -> Result<Value> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(ref binary) = cli.binary {
        config.binary = binary.clone();
    }
    if let Some(ref log_file) = cli.log_file {
        config.log_file = log_file.clone();
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }

    if cli.delete_log {
        return handle_delete(&LogStore::new(&config.log_file)).await;
    }

    let runner = SystemRunner::new(&config.binary, config.timeout());
    dispatch(token, &config, &runner).await
}

/// Run exactly one mode for `token` and return its JSON result.
async fn dispatch(token: &str, config: &Config, runner: &dyn CommandRunner) -> Result<Value> {
    let mode = Mode::parse(token)?;

    let store = LogStore::new(&config.log_file);
    store.ensure_initialized().await?;

    // History and statistics never touch the binary.
    let query = match mode {
        Mode::Log => return handle_log(&store, config.history_limit).await,
        Mode::Stat => return handle_stat(&store).await,
        Mode::Version => BinaryQuery::Version,
        Mode::List => BinaryQuery::List,
        Mode::Run(selection) => BinaryQuery::Run(selection),
    };

    let version = runner.run(&dialects::version_args()).await?;
    let adapter = Dialect::detect(&version).adapter();
    tracing::debug!(dialect = ?adapter.dialect(), "detected speedtest dialect");

    match query {
        BinaryQuery::Version => handle_version(adapter.as_ref(), &version),
        BinaryQuery::List => handle_list(adapter.as_ref(), runner).await,
        BinaryQuery::Run(selection) => handle_run(adapter.as_ref(), runner, &store, &selection).await,
    }
}

/// Modes that need the installed binary.
enum BinaryQuery {
    Version,
    List,
    Run(ServerSelection),
}

// --- Handlers ---

async fn handle_log(store: &LogStore, limit: usize) -> Result<Value> {
    let rows = store.read_all().await?;
    Ok(serde_json::to_value(stats::history(&rows, limit)?)?)
}

async fn handle_stat(store: &LogStore) -> Result<Value> {
    let rows = store.read_all().await?;
    Ok(serde_json::to_value(stats::summarize(&rows, Local::now())?)?)
}

fn handle_version(adapter: &dyn DialectAdapter, version: &str) -> Result<Value> {
    Ok(serde_json::to_value(adapter.version_info(version))?)
}

async fn handle_list(adapter: &dyn DialectAdapter, runner: &dyn CommandRunner) -> Result<Value> {
    let output = runner.run(&adapter.list_args()).await?;
    Ok(serde_json::to_value(adapter.parse_server_list(&output)?)?)
}

async fn handle_run(
    adapter: &dyn DialectAdapter,
    runner: &dyn CommandRunner,
    store: &LogStore,
    selection: &ServerSelection,
) -> Result<Value> {
    let server = match selection {
        ServerSelection::Auto => None,
        ServerSelection::Pinned(id) => Some(id.as_str()),
    };

    let pb = utils::spinner("Running speed test...");
    let output = runner.run(&adapter.run_args(server)).await;
    pb.finish_and_clear();

    let record = adapter.normalize(&output?)?;
    store.append(&record).await?;
    tracing::info!(
        download = record.download,
        upload = record.upload,
        latency = record.latency,
        "speed test recorded"
    );
    Ok(serde_json::to_value(&record)?)
}

async fn handle_delete(store: &LogStore) -> Result<Value> {
    store.delete().await?;
    tracing::info!("Cleared history in {:?}", store.path());
    Ok(json!({ "message": "Speedtest log deleted" }))
}
