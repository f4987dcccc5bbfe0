//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! that can abort startup.

/// Top-level error for the engine binary.
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
        source: roster_core::config::ConfigError,
    },

    /// The storage backend could not be reached or migrated.
    #[error("database error: {source}")]
    Database {
        /// The underlying repository error.
        #[from]
        source: roster_store::DbError,
    },

    /// The event store failed to open.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: roster_store::StoreError,
    },

    /// The intent API failed to start.
    #[error("api error: {source}")]
    Api {
        /// The underlying server error.
        #[from]
        source: roster_api::ServerError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(#[source] std::io::Error),
}
