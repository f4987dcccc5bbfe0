//! Axum router construction for the intent API.
//!
//! Assembles all routes into a single [`Router`] with CORS and HTTP
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /healthz` -- liveness
/// - `POST /api/intents` -- apply a structured intent
/// - `GET /api/scopes/{scope}/events` -- open events in a scope
/// - `GET /api/scopes/{scope}/events/{id}` -- single event snapshot
/// - `GET /api/members` -- core membership registry
/// - `PUT /api/members/{subject}` -- grant membership
/// - `DELETE /api/members/{subject}` -- revoke membership
///
/// CORS allows any origin; the API is expected to sit behind the chat
/// collaborator on a private network.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/intents", post(handlers::post_intent))
        .route("/api/scopes/{scope}/events", get(handlers::list_events))
        .route("/api/scopes/{scope}/events/{id}", get(handlers::get_event))
        .route("/api/members", get(handlers::list_members))
        .route(
            "/api/members/{subject}",
            put(handlers::put_member).delete(handlers::delete_member),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
