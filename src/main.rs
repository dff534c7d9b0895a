//! careportal-cable - GraphQL subscriptions over the care portal cable
//!
//! Main entry point for the operator CLI.

mod cli;
mod cmd_check;
mod cmd_request;
mod cmd_subscribe;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cable_config::{Config, ConfigLoader};

use crate::cli::{Cli, Commands};

/// Get the careportal-cable data directory (~/.careportal-cable).
fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".careportal-cable")
}

/// Initialize tracing with console and daily-rotated file output.
fn init_tracing() -> anyhow::Result<()> {
    let log_dir = data_dir().join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("careportal-cable")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer on drop; keep it for the whole run.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console on stderr; stdout carries command output.
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Load the config file (defaults when missing) and apply environment overrides.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let path = PathBuf::from(ConfigLoader::expand_path(&path.to_string_lossy()));
    debug!("Loading config from {}", path.display());
    ConfigLoader::load_with_env(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Check => cmd_check::handle_check(&config),
        Commands::Subscribe { operation, channel } => {
            cmd_subscribe::handle_subscribe(&config, operation.to_request()?, channel).await
        }
        Commands::Request { operation } => {
            cmd_request::handle_request(&config, operation.to_request()?).await
        }
    }
}
