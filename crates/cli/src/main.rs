//! Quicksurf CLI - airtime and data top-ups from the terminal

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::Commands;
use quicksurf_core::ClientConfig;
use quicksurf_http::client::QuicksurfClientBuilder;
use quicksurf_http::{CredentialStore, FileStore, MemoryStore, QuicksurfClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "quicksurf")]
#[command(about = "Buy airtime and data, check your wallet")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// API root, e.g. https://quicksurf.onrender.com/api
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Directory holding remembered credentials
    #[arg(short = 'd', long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::from_env()?,
        };

        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
            config.validate()?;
        }
        if let Some(state_dir) = &self.state_dir {
            config.state_dir = state_dir.clone();
        }

        Ok(config)
    }
}

fn build_client(config: &ClientConfig) -> Result<QuicksurfClient> {
    let durable = FileStore::open(config.credentials_path());
    debug!(path = %durable.path().display(), "Using credential store");

    let credentials = CredentialStore::new(Arc::new(durable), Arc::new(MemoryStore::new()));
    let client = QuicksurfClientBuilder::from_config(config)
        .credentials(credentials)
        .build()?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.clone().into(), cli.log_json)?;

    let config = cli.load_config()?;
    let client = build_client(&config)?;

    if let Err(e) = cli.command.execute(&client).await {
        error!("Command failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
