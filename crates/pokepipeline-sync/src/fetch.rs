//! HTTP fetching with bounded retries.
//!
//! Every GET ends in one of three outcomes:
//! - `200` with a JSON body -> [`FetchOutcome::Document`]
//! - `404` -> [`FetchOutcome::NotFound`], immediately, no retry
//! - anything else (other status, transport error, unparsable body) is
//!   transient: warn, sleep `backoff * attempt`, try again, and after
//!   `max_retries` attempts give up with [`FetchOutcome::Failed`].
//!
//! No error escapes [`Fetcher::fetch`]; callers only see the tri-state outcome.

use serde_json::Value;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::observer::PipelineObserver;

// ============================================================================
// Transport seam
// ============================================================================

/// Status and raw body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request that produced no HTTP response at all.
#[derive(Debug, Clone, thiserror::Error)]
#[error("request to {url} failed: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

/// Performs a single blocking GET.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `reqwest` blocking client with a fixed per-request timeout.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pokepipeline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client (proxies, TLS roots, ...).
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let fail = |e: reqwest::Error| TransportError {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = self.client.get(url).send().map_err(fail)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(fail)?;
        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Blocks the pipeline between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Attempt cap and base delay. The delay grows linearly with the attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Document(Value),
    NotFound,
    Failed { attempts: u32 },
}

impl FetchOutcome {
    /// The document, treating not-found and failure alike.
    pub fn into_document(self) -> Option<Value> {
        match self {
            FetchOutcome::Document(doc) => Some(doc),
            FetchOutcome::NotFound | FetchOutcome::Failed { .. } => None,
        }
    }
}

pub struct Fetcher {
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: impl Transport + 'static, policy: RetryPolicy) -> Self {
        Self {
            transport: Box::new(transport),
            sleeper: Box::new(ThreadSleeper),
            policy,
        }
    }

    /// Real HTTP transport with the configured timeout and retry policy.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, FetchError> {
        Ok(Self::new(ReqwestTransport::new(config.timeout)?, config.retry))
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn fetch(&self, url: &str, observer: &dyn PipelineObserver) -> FetchOutcome {
        let max = self.policy.max_retries;

        for attempt in 1..=max {
            tracing::debug!(url, attempt, max, "GET");
            match self.transport.get(url) {
                Ok(resp) if resp.status == 200 => match serde_json::from_str(&resp.body) {
                    Ok(doc) => return FetchOutcome::Document(doc),
                    Err(e) => observer.on_warning(&format!(
                        "Invalid JSON from {url}: {e}. Attempt {attempt}/{max}"
                    )),
                },
                Ok(resp) if resp.status == 404 => return FetchOutcome::NotFound,
                Ok(resp) => observer.on_warning(&format!(
                    "{url} returned status {}. Attempt {attempt}/{max}",
                    resp.status
                )),
                Err(e) => observer.on_warning(&format!(
                    "Request exception for {url}: {}. Attempt {attempt}/{max}",
                    e.message
                )),
            }
            self.sleeper.sleep(self.policy.delay_for(attempt));
        }

        observer.on_failure(&format!("Failed to fetch {url} after {max} attempts."));
        FetchOutcome::Failed { attempts: max }
    }
}
