//! bucketferry - watch directories and ferry new files to S3
//!
//! Loads the JSON configuration, validates it, builds the S3 client and runs
//! the watch service until SIGINT/SIGTERM. The configuration file is taken
//! from `-c/--config` or, failing that, the `BUCKETFERRY_CONFIG` environment
//! variable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucketferry_core::{config::Config, ports::IObjectStorage};
use bucketferry_s3::S3ObjectStorage;
use bucketferry_sync::service::WatchService;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--config` is not given.
const CONFIG_ENV: &str = "BUCKETFERRY_CONFIG";

#[derive(Debug, Parser)]
#[command(
    name = "bucketferry",
    version,
    about = "Watch directories and upload new files to S3 after a quiet period"
)]
struct Cli {
    /// Configuration file (JSON). Falls back to $BUCKETFERRY_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Resolves the configuration file location from the flag or environment.
fn config_location(flag: Option<PathBuf>, env: Option<String>) -> Option<PathBuf> {
    flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
}

/// Maps verbosity (flag count, config `verbose`) to a default filter level.
fn default_filter(verbose: u8, config_verbose: bool) -> &'static str {
    match (verbose, config_verbose) {
        (0, false) => "info",
        (0, true) | (1, _) => "debug",
        _ => "trace",
    }
}

/// Waits for SIGINT or SIGTERM, then cancels the token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(config_path) = config_location(cli.config, std::env::var(CONFIG_ENV).ok()) else {
        anyhow::bail!("no configuration file: pass --config FILE or set ${CONFIG_ENV}");
    };

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    // Tracing before validation so the error output is consistent
    let filter = default_filter(cli.verbose, config.verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let validation_errors = config.validate();
    if !validation_errors.is_empty() {
        for err in &validation_errors {
            error!("configuration error: {err}");
        }
        anyhow::bail!(
            "invalid configuration ({} error(s)) in {}",
            validation_errors.len(),
            config_path.display()
        );
    }

    info!(config = %config_path.display(), paths = config.paths.len(), "bucketferry starting");

    // Fails fast when credentials cannot be established
    let storage: Arc<dyn IObjectStorage> = Arc::new(
        S3ObjectStorage::new(&config.credentials).context("failed to build the S3 client")?,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let result = WatchService::start(&config, storage, shutdown).await;

    match &result {
        Ok(()) => info!("bucketferry shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "bucketferry exiting with error"),
    }

    result
}
