//! Backend-agnostic repository.
//!
//! Uses enum dispatch instead of trait objects because async methods
//! are not dyn-compatible in Rust.

use chrono::{DateTime, Utc};

use roster_types::{CoreMember, Event, EventId, ScopeId, SubjectId};

use crate::error::DbError;
use crate::memory::MemoryRepository;
use crate::postgres::PostgresRepository;

/// A value paired with the version token it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Incremented on every successful save, starting at 1.
    pub version: u64,
}

/// Result of a compare-and-swap save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written; carries the new version.
    Committed(u64),
    /// Someone else saved (or deleted) first. Nothing was written.
    Stale,
}

/// Where events and core members are persisted.
#[derive(Debug, Clone)]
pub enum Repository {
    /// Process-local maps.
    Memory(MemoryRepository),
    /// `PostgreSQL` tables.
    Postgres(PostgresRepository),
}

impl Repository {
    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Store a new event at version 1.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the id is taken, or the backend's error.
    pub async fn insert(&self, event: &Event) -> Result<u64, DbError> {
        match self {
            Self::Memory(repo) => repo.insert(event).await,
            Self::Postgres(repo) => repo.insert(event).await,
        }
    }

    /// Read an event and its current version.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn load(&self, id: EventId) -> Result<Option<Versioned<Event>>, DbError> {
        match self {
            Self::Memory(repo) => repo.load(id).await,
            Self::Postgres(repo) => repo.load(id).await,
        }
    }

    /// Overwrite an event if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error. A version mismatch is not an error; it
    /// is reported as [`SaveOutcome::Stale`].
    pub async fn save(&self, event: &Event, expected: u64) -> Result<SaveOutcome, DbError> {
        match self {
            Self::Memory(repo) => repo.save(event, expected).await,
            Self::Postgres(repo) => repo.save(event, expected).await,
        }
    }

    /// Remove an event. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn delete(&self, id: EventId) -> Result<bool, DbError> {
        match self {
            Self::Memory(repo) => repo.delete(id).await,
            Self::Postgres(repo) => repo.delete(id).await,
        }
    }

    /// Every event in a scope, expired or not.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn list_scope(&self, scope: &ScopeId) -> Result<Vec<Event>, DbError> {
        match self {
            Self::Memory(repo) => repo.list_scope(scope).await,
            Self::Postgres(repo) => repo.list_scope(scope).await,
        }
    }

    /// Every event, across scopes, whose window has not ended at `now`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Event>, DbError> {
        match self {
            Self::Memory(repo) => repo.list_active(now).await,
            Self::Postgres(repo) => repo.list_active(now).await,
        }
    }

    /// Core members in registry order.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn list_members(&self) -> Result<Vec<CoreMember>, DbError> {
        match self {
            Self::Memory(repo) => repo.list_members().await,
            Self::Postgres(repo) => repo.list_members().await,
        }
    }

    /// Append a core member, or refresh its display name. Returns `true`
    /// if the member is new.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn add_member(&self, member: &CoreMember) -> Result<bool, DbError> {
        match self {
            Self::Memory(repo) => repo.add_member(member).await,
            Self::Postgres(repo) => repo.add_member(member).await,
        }
    }

    /// Remove a core member. Returns `false` if it was not a member.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn remove_member(&self, subject: &SubjectId) -> Result<bool, DbError> {
        match self {
            Self::Memory(repo) => repo.remove_member(subject).await,
            Self::Postgres(repo) => repo.remove_member(subject).await,
        }
    }
}

impl From<MemoryRepository> for Repository {
    fn from(repo: MemoryRepository) -> Self {
        Self::Memory(repo)
    }
}

impl From<PostgresRepository> for Repository {
    fn from(repo: PostgresRepository) -> Self {
        Self::Postgres(repo)
    }
}
