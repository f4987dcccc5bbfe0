//! Error types for the store layer.
//!
//! Repository failures are [`DbError`], which wraps the underlying
//! [`sqlx`] and [`serde_json`] errors. Everything the [`EventStore`]
//! returns is a [`StoreError`]: either a domain rejection that the caller
//! should render, or an infrastructure failure that it should log.
//!
//! [`EventStore`]: crate::EventStore

use roster_core::RosterError;
use roster_core::invariants::InvariantViolation;
use roster_types::EventId;

/// Errors that can occur in a repository backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An insert collided with an existing id.
    #[error("Duplicate event id: {0}")]
    Duplicate(EventId),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors returned by [`EventStore`](crate::EventStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The intent was rejected by domain rules.
    #[error(transparent)]
    Domain(#[from] RosterError),

    /// The backing repository failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A transaction produced an event that breaks a structural invariant.
    /// Nothing was persisted.
    #[error("event {event_id} would violate {} invariant(s)", violations.len())]
    Integrity {
        /// The event being modified.
        event_id: EventId,
        /// What broke.
        violations: Vec<InvariantViolation>,
    },
}

impl StoreError {
    /// The domain error, if this is one.
    pub const fn domain(&self) -> Option<&RosterError> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Db(_) | Self::Integrity { .. } => None,
        }
    }
}
