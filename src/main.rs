//! flickr-snapshot: builds static JSON snapshots of a Flickr library.
//!
//! A build lists the user's photos or albums, fetches every photo's size
//! variants with bounded concurrency, and atomically replaces a JSON cache
//! file in the public directory. The `serve` command exposes that directory
//! over HTTP together with secret-token refresh triggers; `build` runs one
//! build and exits.

#![warn(clippy::all)]

mod cli;
mod config;
mod flickr;
mod server;
mod shutdown;
mod snapshot;
mod systemd;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Command;
use config::Config;
use flickr::RestClient;
use snapshot::{Aggregator, Builder};
use systemd::SystemdNotifier;

fn build_pipeline(config: &Config, notifier: SystemdNotifier) -> anyhow::Result<Builder> {
    let client = RestClient::new(config.api_base.clone(), config.request_timeout)?;
    let aggregator = Aggregator::new(
        Arc::new(client),
        config.credentials.clone(),
        config.user_id.clone(),
        config.concurrency,
    );
    Ok(Builder::new(aggregator, config.public_dir.clone(), notifier))
}

/// Run one build in the foreground; a failed build is a failed process.
async fn run_build(config: Config, args: cli::BuildArgs) -> anyhow::Result<()> {
    let builder = build_pipeline(&config, SystemdNotifier::new(false))?;
    match builder.run(args.kind).await {
        Some(result) => {
            let meta = result?;
            tracing::info!(last_modified = meta.last_modified, "Build complete");
            Ok(())
        }
        None => anyhow::bail!("A {} build is already running", args.kind),
    }
}

async fn run_serve(config: Config, args: cli::ServeArgs) -> anyhow::Result<()> {
    let notifier = SystemdNotifier::new(config.notify_systemd);
    let builder = Arc::new(build_pipeline(&config, notifier)?);
    let refresh_token = config
        .refresh_token
        .clone()
        .ok_or(config::ConfigError::Missing("CACHE_REFRESH_TOKEN"))?;

    let shutdown_token = shutdown::install_signal_handler()?;
    let state = Arc::new(server::AppState {
        builder,
        refresh_token,
    });
    server::serve(args.listen, state, shutdown_token, notifier).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        types::LogLevel::Debug => "debug",
        types::LogLevel::Info => "info",
        types::LogLevel::Warn => "warn",
        types::LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = Config::from_cli(&cli)?;
    tracing::debug!(?config, "Loaded configuration");
    tracing::info!(
        concurrency = config.concurrency,
        public_dir = %config.public_dir.display(),
        "Starting flickr-snapshot"
    );

    match cli.effective_command() {
        Command::Serve(args) => run_serve(config, args).await,
        Command::Build(args) => run_build(config, args).await,
    }
}
