//! Pipeline configuration.
//!
//! Precedence, per field:
//! 1) explicit override (CLI flag, set by the caller after loading)
//! 2) environment variable
//! 3) built-in default
//!
//! An empty environment variable counts as unset. A value that does not parse
//! is an error rather than a silent fallback.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 500;
pub const DEFAULT_DB_PATH: &str = "pokepipeline.db";

pub const BASE_URL_ENV: &str = "POKEPIPELINE_BASE_URL";
pub const TIMEOUT_SECS_ENV: &str = "POKEPIPELINE_TIMEOUT_SECS";
pub const MAX_RETRIES_ENV: &str = "POKEPIPELINE_MAX_RETRIES";
pub const BACKOFF_MS_ENV: &str = "POKEPIPELINE_BACKOFF_MS";
pub const DB_PATH_ENV: &str = "POKEPIPELINE_DB";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?} (expected {expected})")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported base url scheme {scheme:?} (expected http or https)")]
    Scheme { scheme: String },

    #[error("max retries must be at least 1")]
    ZeroRetries,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// API root, without trailing slash (e.g. `https://pokeapi.co/api/v2`).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// SQLite database file.
    pub db_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy {
                max_retries: DEFAULT_MAX_RETRIES,
                backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            },
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `POKEPIPELINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`PipelineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = var(BASE_URL_ENV).unwrap_or(defaults.base_url);
        let timeout_secs = parse_var(&var, TIMEOUT_SECS_ENV, DEFAULT_TIMEOUT_SECS, "integer seconds")?;
        let max_retries = parse_var(&var, MAX_RETRIES_ENV, DEFAULT_MAX_RETRIES, "integer >= 1")?;
        let backoff_ms = parse_var(&var, BACKOFF_MS_ENV, DEFAULT_BACKOFF_MS, "integer milliseconds")?;
        let db_path = var(DB_PATH_ENV).map(PathBuf::from).unwrap_or(defaults.db_path);

        let config = Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_retries,
                backoff: Duration::from_millis(backoff_ms),
            },
            db_path,
        };
        config.validate()
    }

    /// Check invariants and normalize the base url. Call again after applying
    /// overrides.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&trimmed).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Scheme {
                scheme: parsed.scheme().to_string(),
            });
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        self.base_url = trimmed;
        Ok(self)
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
            var: name,
            value: raw,
            expected,
        }),
    }
}
