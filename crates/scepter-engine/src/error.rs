//! Error types for the Scepter service binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup.

/// Top-level error for the service binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: scepter_core::config::ConfigError,
    },

    /// Scheduler construction failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: scepter_core::scheduler::SchedulerError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: scepter_observer::ServerError,
    },
}
