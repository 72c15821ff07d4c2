//! Resale watcher CLI
//!
//! Runs continuously by default; `--once` runs a single cycle for external
//! schedulers such as cron or CI jobs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use resale_watch::{
    error::Result,
    models::Config,
    pipeline::{self, RunMode, Watcher},
    services::AvailabilityDetector,
    storage::{LocalStateStore, StateStorage},
    utils::log,
};

/// Watches RELIEF Ticket for new resale listings
#[derive(Parser, Debug)]
#[command(name = "resale-watch", version, about = "RELIEF Ticket resale watcher")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration and detector selectors
    Validate,

    /// Show stored notification state
    State,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    ::log::debug!("Loaded configuration from {}", cli.config.display());
    let config = Arc::new(config);

    match cli.command {
        Some(Command::Validate) => {
            ::log::info!("Validating configuration...");
            config.validate()?;
            AvailabilityDetector::new(&config.detector)?;
            ::log::info!("✓ Config OK");
        }

        Some(Command::State) => {
            let store = LocalStateStore::new(&config.watch.state_file);
            let state = store.load().await?;
            ::log::info!("State file: {}", store.path().display());
            ::log::info!("Notified keys: {}", state.len());
            match state.last_check() {
                Some(at) => ::log::info!("Last check: {}", at.to_rfc3339()),
                None => ::log::info!("Last check: never"),
            }
            for key in state.keys() {
                log::sub_item(key.as_str());
            }
        }

        None => {
            config.validate()?;
            let mode = if cli.once {
                RunMode::Once
            } else {
                RunMode::Continuous
            };
            let watcher = Watcher::from_config(Arc::clone(&config))?;

            log::header("RELIEF Ticket resale watcher");
            ::log::info!("Targets: {}", config.watch.artists.join(", "));
            ::log::info!("Mode: {}", mode.describe(config.watch.check_interval()));
            ::log::info!(
                "LINE: {}",
                if config.notifier.line_configured() {
                    "configured"
                } else {
                    "not configured"
                }
            );
            log::separator();

            match mode {
                RunMode::Once => {
                    pipeline::run_once(&watcher).await?;
                }
                RunMode::Continuous => pipeline::run_forever(&watcher).await?,
            }
        }
    }

    Ok(())
}
