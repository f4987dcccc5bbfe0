//! Shared type definitions for the roster workspace.
//!
//! This crate is the single source of truth for the data that crosses
//! crate and process boundaries: the event aggregate, intents coming in
//! from the command parser, and outcomes going out to the rendering
//! collaborator. Types flow to `TypeScript` via `ts-rs` so chat front-ends
//! can render snapshots without re-declaring them.
//!
//! # Modules
//!
//! - [`ids`] -- `EventId` (UUID v7) plus opaque subject and scope keys
//! - [`enums`] -- Lifecycle status, quantity semantics, audit actions
//! - [`structs`] -- The event aggregate, registrations, operation results
//! - [`intents`] -- Intents, selectors, snapshots, and outcomes

pub mod enums;
pub mod ids;
pub mod intents;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AuditAction, EventStatus, QuantityMode};
pub use ids::{EventId, ScopeId, SubjectId};
pub use intents::{EventDraft, EventSelector, EventSnapshot, Intent, IntentOutcome, Operation};
pub use structs::{
    AdmitResult, AuditRecord, CoreMember, Event, EventKind, EventWindow, Promotion, Registration,
    ReminderState, WithdrawResult, total_quantity,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for every #[ts(export)] type to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::SubjectId::export_all();
        let _ = crate::ids::ScopeId::export_all();

        // Enums
        let _ = crate::enums::EventStatus::export_all();
        let _ = crate::enums::QuantityMode::export_all();
        let _ = crate::enums::AuditAction::export_all();

        // Structs
        let _ = crate::structs::EventKind::export_all();
        let _ = crate::structs::EventWindow::export_all();
        let _ = crate::structs::Registration::export_all();
        let _ = crate::structs::ReminderState::export_all();
        let _ = crate::structs::CoreMember::export_all();
        let _ = crate::structs::Event::export_all();
        let _ = crate::structs::AdmitResult::export_all();
        let _ = crate::structs::Promotion::export_all();
        let _ = crate::structs::WithdrawResult::export_all();
        let _ = crate::structs::AuditRecord::export_all();

        // Intents
        let _ = crate::intents::EventDraft::export_all();
        let _ = crate::intents::EventSelector::export_all();
        let _ = crate::intents::Operation::export_all();
        let _ = crate::intents::Intent::export_all();
        let _ = crate::intents::EventSnapshot::export_all();
        let _ = crate::intents::IntentOutcome::export_all();
    }
}
