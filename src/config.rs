// src/config.rs
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Access tokens live for 60 minutes; refresh ten minutes early.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 50 * 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub token_file: PathBuf,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            token_file: default_token_file(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

pub fn default_token_file() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(".foliofy").join("tokens.json")
}

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Base URL of the portfolio API
    #[arg(long, env = "FOLIOFY_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Where the session tokens are persisted
    #[arg(long, env = "FOLIOFY_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Seconds between silent token refreshes
    #[arg(long, env = "FOLIOFY_REFRESH_INTERVAL_SECS", default_value_t = DEFAULT_REFRESH_INTERVAL_SECS, global = true)]
    pub refresh_interval_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "FOLIOFY_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,
}

impl ConfigArgs {
    pub fn into_config(self) -> Config {
        Config {
            api_url: self.api_url,
            token_file: self.token_file.unwrap_or_else(default_token_file),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs.max(1)),
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }
}
