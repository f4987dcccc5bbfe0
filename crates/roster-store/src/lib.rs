//! Persistence and scheduling for the roster engine.
//!
//! The domain rules in `roster-core` operate on one event in memory. This
//! crate makes them safe to run against shared storage: every mutation
//! goes through [`EventStore::transact`], which serializes writers per
//! event in-process and uses a version token to detect writers in other
//! processes.
//!
//! # Architecture
//!
//! ```text
//! Intent ──> EventStore::apply ──> resolve selector ──> transact(id, f)
//!                                                        |
//!                                      Repository::{Memory, Postgres}
//!                                                        |
//!                          audit broadcast <── committed mutation
//!
//! ReminderScheduler::tick ──> list_active ──> lock ──> push ──> mark sent
//! ```
//!
//! # Modules
//!
//! - [`event_store`] -- Atomic transactions, selection, membership, audit
//! - [`repository`] -- Enum-dispatched backend with versioned saves
//! - [`memory`] -- Process-local backend
//! - [`postgres`] -- `PostgreSQL` backend
//! - [`scheduler`] -- Reminder ticks
//! - [`transport`] -- Reminder delivery (webhook, log)
//! - [`error`] -- Shared error types

pub mod error;
pub mod event_store;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod scheduler;
pub mod transport;

// Re-export primary types for convenience.
pub use error::{DbError, StoreError};
pub use event_store::EventStore;
pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{Repository, SaveOutcome, Versioned};
pub use scheduler::{ReminderScheduler, TickReport};
pub use transport::{LogTransport, ReminderTransport, Transport, TransportError, WebhookTransport};
