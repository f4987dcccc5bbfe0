//! Error types for the intent API.
//!
//! [`ApiError`] unifies every failure a handler can hit into a single enum
//! that renders as an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Domain
//! rejections keep their [`RosterError`] so the status code and the
//! machine-readable `code` can be chosen per variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roster_core::RosterError;
use roster_store::StoreError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine rejected the request.
    #[error(transparent)]
    Domain(#[from] RosterError),

    /// An event id in the path could not be parsed.
    #[error("invalid event id: {0}")]
    InvalidId(String),

    /// A storage or integrity failure. Details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => Self::Domain(domain),
            other => {
                tracing::error!(error = %other, "Store failure while serving request");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Domain(err) => match err {
                RosterError::EventNotFound => StatusCode::NOT_FOUND,
                RosterError::PriorityWindowActive => StatusCode::FORBIDDEN,
                RosterError::EventExpired
                | RosterError::SignupWindowClosed
                | RosterError::NotRegistered
                | RosterError::AmbiguousSelector { .. }
                | RosterError::Conflict { .. } => StatusCode::CONFLICT,
                RosterError::InvalidQuantity | RosterError::InvalidEvent { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
            Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable `snake_case` identifier for clients to branch on.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Domain(err) => match err {
                RosterError::EventNotFound => "event_not_found",
                RosterError::EventExpired => "event_expired",
                RosterError::SignupWindowClosed => "signup_window_closed",
                RosterError::PriorityWindowActive => "priority_window_active",
                RosterError::NotRegistered => "not_registered",
                RosterError::AmbiguousSelector { .. } => "ambiguous_selector",
                RosterError::InvalidQuantity => "invalid_quantity",
                RosterError::InvalidEvent { .. } => "invalid_event",
                RosterError::Conflict { .. } => "conflict",
            },
            Self::InvalidId(_) => "invalid_id",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(_) => String::from("internal error"),
            other => other.to_string(),
        };

        let mut body = serde_json::Map::new();
        body.insert(String::from("error"), serde_json::Value::String(message));
        body.insert(String::from("code"), serde_json::Value::from(self.code()));
        body.insert(String::from("status"), serde_json::Value::from(status.as_u16()));
        if let Self::Domain(err) = &self {
            if let RosterError::AmbiguousSelector { candidates } = err {
                body.insert(String::from("candidates"), serde_json::json!(candidates));
            }
            if err.is_retryable() {
                body.insert(String::from("retryable"), serde_json::Value::Bool(true));
            }
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use roster_types::EventId;

    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(RosterError::EventNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RosterError::PriorityWindowActive).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(RosterError::InvalidQuantity).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let conflict = ApiError::from(RosterError::Conflict {
            event_id: EventId::new(),
            attempts: 3,
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.code(), "conflict");
    }

    #[test]
    fn store_domain_errors_are_unwrapped() {
        let err = ApiError::from(StoreError::Domain(RosterError::SignupWindowClosed));
        assert_eq!(err.code(), "signup_window_closed");
    }
}
