use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::cli::{Cli, Command};
use crate::flickr::{Credentials, DEFAULT_API_BASE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid Flickr API base URL '{value}': {source}")]
    InvalidApiBase {
        value: String,
        source: url::ParseError,
    },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Validated process configuration.
pub struct Config {
    pub credentials: Credentials,
    pub user_id: String,
    /// Only required when serving refresh triggers.
    pub refresh_token: Option<String>,
    pub public_dir: PathBuf,
    pub api_base: Url,
    pub request_timeout: Option<Duration>,
    pub concurrency: usize,
    pub notify_systemd: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field("user_id", &self.user_id)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("public_dir", &self.public_dir)
            .field("api_base", &self.api_base.as_str())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// A present, non-blank value, or `Missing` naming its environment variable.
fn required(value: &Option<String>, env: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::Missing(env)),
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Validate the parsed command line.
    ///
    /// Runs before any Flickr client exists, so a misconfigured process
    /// never reaches the network.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let args = &cli.flickr;
        let api_key = required(&args.api_key, "FLICKR_API_KEY")?;
        let secret = required(&args.secret, "FLICKR_SECRET")?;
        let user_id = required(&args.user_id, "FLICKR_USER_ID")?;

        let refresh_token = match cli.effective_command() {
            Command::Serve(_) => Some(required(&cli.refresh_token, "CACHE_REFRESH_TOKEN")?),
            Command::Build(_) => optional(&cli.refresh_token),
        };

        if args.concurrency == 0 {
            return Err(ConfigError::Zero {
                name: "FLICKR_CONCURRENCY",
            });
        }
        let request_timeout = match args.request_timeout {
            Some(0) => {
                return Err(ConfigError::Zero {
                    name: "FLICKR_REQUEST_TIMEOUT",
                })
            }
            other => other.map(Duration::from_secs),
        };

        let api_base = optional(&args.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&api_base).map_err(|source| ConfigError::InvalidApiBase {
            value: api_base.clone(),
            source,
        })?;

        Ok(Self {
            credentials: Credentials {
                api_key,
                secret,
                developer_id: optional(&args.developer_id),
            },
            user_id,
            refresh_token,
            public_dir: expand_tilde(&cli.public_dir),
            api_base,
            request_timeout,
            concurrency: args.concurrency,
            notify_systemd: cli.notify_systemd,
        })
    }
}
