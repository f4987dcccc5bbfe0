//! HTTP surface for the roster allocation engine.
//!
//! This crate provides an Axum server that hosts an [`EventStore`]:
//!
//! - **`POST /api/intents`** applies a structured [`Intent`] already parsed
//!   by the upstream chat collaborator. The server clock supplies `now`.
//! - **Read endpoints** list the open events of a scope, fetch one event
//!   snapshot, and list the core membership registry.
//! - **Membership endpoints** grant and revoke core membership.
//! - **`GET /healthz`** for liveness probes.
//!
//! Every failure is an [`ApiError`] rendered as `{"error", "code",
//! "status"}` JSON.
//!
//! [`EventStore`]: roster_store::EventStore
//! [`Intent`]: roster_types::Intent
//! [`ApiError`]: error::ApiError

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, spawn_api};
pub use state::AppState;
