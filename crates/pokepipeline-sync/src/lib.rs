//! PokePipeline synchronization
//!
//! Drives the single-pass ETL from PokeAPI into the normalized store:
//!
//! ```text
//! ids ──► Fetcher ──► extract ──► species ─► chain ─► flatten
//!           │  (retry/backoff)                          │
//!           ▼                                           ▼
//!        skip id            one transaction per pokemon ──► Store
//! ```
//!
//! Processing is strictly sequential. Fetch failures become a skipped id,
//! malformed documents fail only their own id, and a broken species/chain
//! lookup just leaves the pokemon without chain linkage.

pub mod config;
pub mod fetch;
pub mod observer;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use fetch::{
    FetchError, FetchOutcome, Fetcher, HttpResponse, ReqwestTransport, RetryPolicy, Sleeper,
    ThreadSleeper, Transport, TransportError,
};
pub use observer::{NullObserver, PipelineObserver, TracingObserver};
pub use pipeline::{EntityReport, EntityState, Pipeline, PipelineError, RunSummary};
