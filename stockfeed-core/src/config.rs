//! Run configuration.
//!
//! Every field has a built-in default, so a config file is optional. When
//! one is given it is TOML and may set any subset of fields:
//!
//! ```toml
//! tickers = ["QQQ", "VOO"]
//! data_dir = "out/data"
//!
//! [fetcher]
//! timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the Alpha Vantage API key.
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Placeholder key accepted by Alpha Vantage for a few heavily rate-limited calls.
pub const DEMO_API_KEY: &str = "demo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings shared by the three pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Tickers processed by `collect`, `update` and `convert`.
    pub tickers: Vec<String>,
    /// Years of history kept by a full collection.
    pub years_back: u32,
    /// Days of recent data merged by an incremental update.
    pub update_days_back: u32,
    /// Pause between successive API calls.
    pub delay_secs: u64,
    /// Where `{TICKER}.json` datasets are written.
    pub data_dir: PathBuf,
    /// Where `{TICKER}_historical_data.csv` exports are read from.
    pub history_dir: PathBuf,
    pub fetcher: FetcherConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["QQQ".into(), "VOO".into(), "SOXX".into()],
            years_back: 2,
            update_days_back: 7,
            // free tier: 5 calls/minute
            delay_secs: 15,
            data_dir: PathBuf::from("src/main/resources/data"),
            history_dir: PathBuf::from("history"),
            fetcher: FetcherConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// HTTP settings for the live fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Explicit key; falls back to `ALPHA_VANTAGE_API_KEY`, then to `demo`.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Skip TLS certificate validation. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.alphavantage.co/query".into(),
            api_key: None,
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl FetcherConfig {
    /// The key that will actually be sent.
    pub fn resolved_api_key(&self) -> String {
        resolve_api_key(self.api_key.clone(), std::env::var(API_KEY_ENV).ok())
    }

    pub fn uses_demo_key(&self) -> bool {
        self.resolved_api_key() == DEMO_API_KEY
    }

    /// Key as it may be printed: the first four characters only.
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.resolved_api_key())
    }
}

fn resolve_api_key(configured: Option<String>, from_env: Option<String>) -> String {
    configured
        .or(from_env)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| DEMO_API_KEY.to_string())
}

fn mask_api_key(key: &str) -> String {
    if key == DEMO_API_KEY {
        return "demo (limited)".into();
    }
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}...")
}
