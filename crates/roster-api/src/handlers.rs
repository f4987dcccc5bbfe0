//! REST endpoint handlers for the intent API.
//!
//! Handlers are thin: they stamp the request with the server clock, call
//! the [`EventStore`](roster_store::EventStore), and serialize the result.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/healthz` | Liveness probe |
//! | `POST` | `/api/intents` | Apply a structured intent |
//! | `GET` | `/api/scopes/{scope}/events` | Open events in a scope |
//! | `GET` | `/api/scopes/{scope}/events/{id}` | One event snapshot |
//! | `GET` | `/api/members` | List core members |
//! | `PUT` | `/api/members/{subject}` | Grant core membership |
//! | `DELETE` | `/api/members/{subject}` | Revoke core membership |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use roster_types::{
    CoreMember, EventId, EventSelector, EventSnapshot, Intent, IntentOutcome, Operation, ScopeId,
    SubjectId,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/intents`: an [`Intent`] without `now`.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentRequest {
    /// The requested operation.
    pub operation: Operation,
    /// Conversation the command came from.
    pub scope: ScopeId,
    /// Target event selection.
    #[serde(default)]
    pub selector: EventSelector,
    /// Who sent the command.
    pub subject: SubjectId,
    /// The sender's resolved display name.
    #[serde(default)]
    pub display_name: String,
    /// Seats requested or released.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl IntentRequest {
    /// Stamp the request into an [`Intent`] evaluated at `now`.
    pub fn at(self, now: chrono::DateTime<chrono::Utc>) -> Intent {
        Intent {
            operation: self.operation,
            scope: self.scope,
            selector: self.selector,
            subject: self.subject,
            display_name: self.display_name,
            quantity: self.quantity,
            now,
        }
    }
}

/// Body of `PUT /api/members/{subject}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberRequest {
    /// Label used when seeding; defaults to the subject id.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response of the membership mutation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    /// Whether the registry changed.
    pub changed: bool,
    /// The registry after the change, in seeding order.
    pub members: Vec<CoreMember>,
}

// ---------------------------------------------------------------------------
// GET /healthz
// ---------------------------------------------------------------------------

/// Liveness probe. Reports the repository backend in use.
pub async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.store.repository().name(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/intents
// ---------------------------------------------------------------------------

/// Apply one structured intent.
///
/// Returns `201 Created` for a create intent and `200 OK` otherwise. Domain
/// rejections come back as [`ApiError`] bodies.
pub async fn post_intent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let intent = request.at(state.now());
    tracing::debug!(
        scope = %intent.scope,
        subject = %intent.subject,
        quantity = intent.quantity,
        "Applying intent"
    );

    let outcome = state.store.apply(intent).await?;
    let status = if matches!(outcome, IntentOutcome::Created { .. }) {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Open events in a scope, earliest start first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
) -> Result<Json<Vec<EventSnapshot>>, ApiError> {
    let events = state
        .store
        .list_open(&ScopeId::new(scope), state.now())
        .await?;
    Ok(Json(events))
}

/// A single event with its current status. Expired events are still served.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path((scope, id)): Path<(String, String)>,
) -> Result<Json<EventSnapshot>, ApiError> {
    let event_id: EventId = id
        .parse()
        .map_err(|e| ApiError::InvalidId(format!("{id}: {e}")))?;
    let snapshot = state
        .store
        .get(&ScopeId::new(scope), event_id, state.now())
        .await?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The core membership registry in seeding order.
pub async fn list_members(State(state): State<Arc<AppState>>) -> Json<Vec<CoreMember>> {
    Json(state.store.members().await)
}

/// Grant core membership. `201 Created` for a new member, `200 OK` when an
/// existing member's display name was refreshed.
pub async fn put_member(
    State(state): State<Arc<AppState>>,
    Path(subject): Path<String>,
    body: Option<Json<MemberRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let display_name = request
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| subject.clone());

    let changed = state
        .store
        .add_member(SubjectId::new(subject), display_name, state.now())
        .await?;
    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(MembershipResponse {
            changed,
            members: state.store.members().await,
        }),
    ))
}

/// Revoke core membership. Removing a non-member is not an error; the
/// response reports `changed: false`.
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(subject): Path<String>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let changed = state
        .store
        .remove_member(&SubjectId::new(subject), state.now())
        .await?;
    Ok(Json(MembershipResponse {
        changed,
        members: state.store.members().await,
    }))
}
