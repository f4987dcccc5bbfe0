//! Enumeration types shared across the roster workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of an event at a given instant.
///
/// Derived from the event's window, kind, and the current time. Never
/// stored; always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// Seasonal event before its priority cutoff: only core members may join.
    PriorityOnly,
    /// Anyone may join or leave.
    Open,
    /// Past the signup cutoff: leaving is still allowed, joining is not.
    SignupClosed,
    /// The window has ended. Terminal; no mutation is accepted.
    Expired,
}

impl EventStatus {
    /// Short human-readable label for rendering.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriorityOnly => "priority only",
            Self::Open => "open",
            Self::SignupClosed => "signup closed",
            Self::Expired => "expired",
        }
    }
}

// ---------------------------------------------------------------------------
// Quantity semantics
// ---------------------------------------------------------------------------

/// How the quantity on an admit intent is interpreted.
///
/// Chat commands such as `+3` were historically read two ways. The
/// engine supports both and lets deployments choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum QuantityMode {
    /// `+N` adds N seats to whatever the subject already holds.
    #[default]
    Additive,
    /// `+N` sets the subject's total holding to N.
    SetTotal,
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// The kind of mutation an [`AuditRecord`](crate::AuditRecord) describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AuditAction {
    /// An event was created.
    EventCreated,
    /// An event was deleted by an explicit intent.
    EventDeleted,
    /// Seats were granted or waitlisted.
    Admitted,
    /// Seats were released.
    Withdrawn,
    /// Waitlisted seats moved into the confirmed list.
    Promoted,
    /// The pre-start reminder was dispatched.
    ReminderSent,
    /// A subject was added to the core membership registry.
    MemberAdded,
    /// A subject was removed from the core membership registry.
    MemberRemoved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&EventStatus::SignupClosed).ok();
        assert_eq!(json.as_deref(), Some("\"signup_closed\""));
    }

    #[test]
    fn quantity_mode_defaults_to_additive() {
        assert_eq!(QuantityMode::default(), QuantityMode::Additive);
        let parsed: Result<QuantityMode, _> = serde_json::from_str("\"set_total\"");
        assert!(matches!(parsed, Ok(QuantityMode::SetTotal)));
    }
}
