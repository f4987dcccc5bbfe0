//! Domain logic for the roster allocation engine.
//!
//! Everything here is synchronous and side-effect free apart from
//! `tracing` output: functions take the event aggregate, the instant to
//! evaluate at, and the membership registry, and either apply a complete
//! change or return a typed error. Persistence, locking, and dispatch
//! live in `roster-store`.
//!
//! # Modules
//!
//! - [`allocation`] -- Admission, withdrawal, and FIFO partial promotion.
//! - [`clock`] -- [`Clock`] trait with system and fixed implementations.
//! - [`config`] -- Configuration loading from `roster-config.yaml` into
//!   strongly-typed structs.
//! - [`creation`] -- Draft validation, policy defaults, and seeding.
//! - [`error`] -- The [`RosterError`] taxonomy.
//! - [`invariants`] -- Structural checks on an event aggregate.
//! - [`lifecycle`] -- Time-derived event status and admission gating.
//! - [`membership`] -- [`CoreMembershipRegistry`] and seasonal seeding.
//! - [`reminder`] -- When a reminder is due.
//! - [`render`] -- Plain-text roster cards.
//! - [`selection`] -- Open-event listing and selector resolution.
//!
//! [`Clock`]: clock::Clock
//! [`RosterError`]: error::RosterError
//! [`CoreMembershipRegistry`]: membership::CoreMembershipRegistry

pub mod allocation;
pub mod clock;
pub mod config;
pub mod creation;
pub mod error;
pub mod invariants;
pub mod lifecycle;
pub mod membership;
pub mod reminder;
pub mod render;
pub mod selection;

pub use error::RosterError;
