use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use crate::types::{BuildKind, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "flickr-snapshot",
    about = "Build static JSON snapshots of a Flickr library and serve them"
)]
pub struct Cli {
    #[command(flatten)]
    pub flickr: FlickrArgs,

    /// Directory the snapshots are written to and served from
    #[arg(long, env = "PUBLIC_DIR", default_value = "public", global = true)]
    pub public_dir: String,

    /// Shared secret expected in the refresh trigger path
    #[arg(long, env = "CACHE_REFRESH_TOKEN", global = true, hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Send sd_notify readiness and status messages
    #[arg(long, global = true)]
    pub notify_systemd: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run, `serve` when none was given.
    pub fn effective_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the public directory and accept refresh triggers (default)
    Serve(ServeArgs),
    /// Build one snapshot and exit
    Build(BuildArgs),
}

/// Flickr account and client settings.
///
/// Credentials are optional here so that missing values surface as a
/// configuration error naming the environment variable.
#[derive(Args, Debug, Clone)]
pub struct FlickrArgs {
    /// Flickr API key
    #[arg(long, env = "FLICKR_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Flickr API secret.
    /// Prefer the FLICKR_SECRET environment variable over the flag.
    #[arg(long, env = "FLICKR_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// NSID of the user whose library is snapshotted
    #[arg(long, env = "FLICKR_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// Developer id, logged with the authentication exchange
    #[arg(long, env = "FLICKR_DEVELOPER_ID", global = true)]
    pub developer_id: Option<String>,

    /// Maximum concurrent Flickr calls per fan-out stage
    #[arg(long, env = "FLICKR_CONCURRENCY", default_value_t = 16, global = true)]
    pub concurrency: usize,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, env = "FLICKR_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    /// Flickr REST endpoint
    #[arg(long, env = "FLICKR_API_BASE", global = true)]
    pub api_base: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:80")]
    pub listen: SocketAddr,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 80)),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Which snapshot to build
    #[arg(value_enum)]
    pub kind: BuildKind,
}
