//! Shared application state for the intent API.
//!
//! [`AppState`] pairs the [`EventStore`] every handler talks to with the
//! [`Clock`] that stamps incoming intents. Tests inject a
//! [`FixedClock`](roster_core::clock::FixedClock) to pin time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roster_core::clock::{Clock, SystemClock};
use roster_store::EventStore;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The store
/// is itself a cheap handle, so cloning the state never copies data.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The event store intents are applied to.
    pub store: EventStore,
    /// Time source for intents and reads.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create application state backed by the wall clock.
    pub fn new(store: EventStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create application state with an explicit clock.
    pub const fn with_clock(store: EventStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The current instant according to the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
