//! Progress reporting.
//!
//! The pipeline never prints. Everything a user would want to see goes through
//! a [`PipelineObserver`], so a CLI can colour it, a service can log it, and a
//! test can record it.

/// Receives human-readable pipeline events.
pub trait PipelineObserver {
    /// Normal progress ("Fetching pokemon id=25 ...").
    fn on_progress(&self, message: &str);

    /// Something recoverable went wrong (retrying, optional lookup failed).
    fn on_warning(&self, message: &str);

    /// A fetch gave up or an id could not be processed.
    fn on_failure(&self, message: &str);
}

/// Forwards events to `tracing` at info/warn/error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_progress(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn on_warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn on_failure(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn on_progress(&self, _message: &str) {}
    fn on_warning(&self, _message: &str) {}
    fn on_failure(&self, _message: &str) {}
}
