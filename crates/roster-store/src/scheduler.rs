//! Reminder scheduler.
//!
//! Each [`ReminderScheduler::tick`] scans every event whose window has not
//! ended and, for each one that is due, runs the per-event atomic path:
//!
//! ```text
//! lock(event)
//!   claim: reload, re-check reminder_due, mark_sent + save
//!          (compare-and-swap; a process that loses sees sent = true)
//!   push(event)                       only if this process won the claim
//!   push failed: release the claim    (while sent_at is still ours)
//! unlock
//! ```
//!
//! The claim is saved before dispatch, so no two processes sharing a
//! backend push the same reminder. A crash between claim and push drops
//! that reminder.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use roster_core::{RosterError, reminder};
use roster_types::{AuditAction, AuditRecord, EventId};

use crate::error::StoreError;
use crate::event_store::{EventStore, audit};
use crate::transport::{ReminderTransport, TransportError};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Events inspected.
    pub scanned: u32,
    /// Events found due on the first pass.
    pub due: u32,
    /// Reminders this process claimed and pushed.
    pub sent: u32,
    /// Reminders whose claim or push failed; retried next tick.
    pub failed: u32,
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Drives reminder dispatch for every event in a store.
#[derive(Debug)]
pub struct ReminderScheduler<T> {
    store: EventStore,
    transport: T,
    lead_minutes: i64,
}

impl<T: ReminderTransport> ReminderScheduler<T> {
    /// Create a scheduler reminding `lead_minutes` ahead of each start.
    pub const fn new(store: EventStore, transport: T, lead_minutes: i64) -> Self {
        Self {
            store,
            transport,
            lead_minutes,
        }
    }

    /// The transport in use.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send every reminder due at `now`.
    ///
    /// Ticking twice with the same `now`, here or in another process on the
    /// same backend, sends at most once per event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] if the active events cannot be listed.
    /// Per-event failures are counted in the report and logged instead.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, StoreError> {
        let events = self.store.repository().list_active(now).await?;
        let active: HashSet<EventId> = events.iter().map(|event| event.id).collect();
        let pruned = self.store.prune_locks(&active).await;
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped lock slots for inactive events");
        }

        let mut report = TickReport {
            scanned: u32::try_from(events.len()).unwrap_or(u32::MAX),
            ..TickReport::default()
        };

        for event in events
            .iter()
            .filter(|event| reminder::reminder_due(event, now, self.lead_minutes))
        {
            report.due = report.due.saturating_add(1);
            match self.dispatch(event.id, now).await {
                Ok(true) => report.sent = report.sent.saturating_add(1),
                Ok(false) => {}
                Err(err) => {
                    report.failed = report.failed.saturating_add(1);
                    tracing::warn!(event_id = %event.id, error = %err, "Reminder dispatch failed");
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                scanned = report.scanned,
                due = report.due,
                sent = report.sent,
                failed = report.failed,
                "Reminder tick"
            );
        }
        Ok(report)
    }

    /// Returns `false` if the reminder was already claimed, or not due
    /// after all.
    async fn dispatch(&self, id: EventId, now: DateTime<Utc>) -> Result<bool, DispatchError> {
        let _guard = self.store.lock(id).await;

        let lead_minutes = self.lead_minutes;
        let claim = self
            .store
            .transact_locked(id, |event| {
                if !reminder::reminder_due(event, now, lead_minutes) {
                    return Ok(false);
                }
                reminder::mark_sent(event, now);
                Ok(true)
            })
            .await;
        let claimed = match claim {
            Ok((true, event)) => event,
            Ok((false, _)) => return Ok(false),
            Err(err) if err.domain() == Some(&RosterError::EventNotFound) => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self.transport.push(&claimed).await {
            self.release(id, now).await;
            return Err(err.into());
        }

        tracing::info!(event_id = %id, scope = %claimed.scope, "Reminder sent");
        self.store.emit(AuditRecord {
            quantity: Some(claimed.participant_total()),
            ..audit(now, AuditAction::ReminderSent, Some(&claimed))
        });
        Ok(true)
    }

    /// Undo a claim whose push failed so the next tick retries it.
    async fn release(&self, id: EventId, now: DateTime<Utc>) {
        let released = self
            .store
            .transact_locked(id, |event| {
                if event.reminder.sent_at == Some(now) {
                    event.reminder.sent = false;
                    event.reminder.sent_at = None;
                }
                Ok(())
            })
            .await;
        if let Err(err) = released {
            tracing::error!(
                event_id = %id,
                error = %err,
                "Could not release reminder claim; it will not be retried"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use chrono::{TimeDelta, TimeZone};
    use roster_core::config::RosterConfig;
    use roster_types::{EventDraft, EventKind, EventWindow, ScopeId};

    use super::*;
    use crate::memory::MemoryRepository;

    #[derive(Debug, Default)]
    struct CountingTransport {
        pushed: AtomicU32,
        failing: AtomicBool,
    }

    impl ReminderTransport for Arc<CountingTransport> {
        async fn push(&self, _event: &roster_types::Event) -> Result<(), TransportError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Rejected(String::from("down")));
            }
            self.pushed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).single().unwrap()
    }

    async fn setup() -> (EventStore, EventId, Arc<CountingTransport>) {
        let store = EventStore::open(MemoryRepository::new().into(), &RosterConfig::default())
            .await
            .unwrap();
        let draft = EventDraft {
            kind: EventKind::Standard,
            title: String::from("Weekend badminton"),
            location: String::from("Court 10"),
            window: EventWindow {
                start: start(),
                end: start() + TimeDelta::hours(2),
            },
            capacity: Some(8),
            waitlist_capacity: None,
            signup_cutoff_minutes: None,
        };
        let (event, _) = store
            .create(ScopeId::new("group"), draft, start() - TimeDelta::days(1))
            .await
            .unwrap();
        (store, event.id, Arc::new(CountingTransport::default()))
    }

    #[tokio::test]
    async fn sends_once_inside_lead_window() {
        let (store, id, transport) = setup().await;
        let scheduler = ReminderScheduler::new(store.clone(), Arc::clone(&transport), 60);

        let early = scheduler.tick(start() - TimeDelta::hours(3)).await.unwrap();
        assert_eq!(early.due, 0);

        let now = start() - TimeDelta::minutes(45);
        let first = scheduler.tick(now).await.unwrap();
        assert_eq!(first.sent, 1);
        let second = scheduler.tick(now).await.unwrap();
        assert_eq!(second.due, 0);
        assert_eq!(transport.pushed.load(Ordering::SeqCst), 1);

        let stored = store.repository().load(id).await.unwrap().unwrap().value;
        assert!(stored.reminder.sent);
        assert_eq!(stored.reminder.sent_at, Some(now));
    }

    #[tokio::test]
    async fn failed_push_is_retried_next_tick() {
        let (store, id, transport) = setup().await;
        let scheduler = ReminderScheduler::new(store.clone(), Arc::clone(&transport), 60);
        let now = start() - TimeDelta::minutes(30);

        transport.failing.store(true, Ordering::SeqCst);
        let failed = scheduler.tick(now).await.unwrap();
        assert_eq!(failed.failed, 1);
        assert!(!store.repository().load(id).await.unwrap().unwrap().value.reminder.sent);

        transport.failing.store(false, Ordering::SeqCst);
        let retried = scheduler.tick(now + TimeDelta::minutes(1)).await.unwrap();
        assert_eq!(retried.sent, 1);
        assert_eq!(transport.pushed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_ticks_send_once() {
        let (store, _, transport) = setup().await;
        let scheduler = Arc::new(ReminderScheduler::new(store, Arc::clone(&transport), 60));
        let now = start() - TimeDelta::minutes(10);

        let a = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.tick(now).await.unwrap() }
        });
        let b = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.tick(now).await.unwrap() }
        });
        let total = a.await.unwrap().sent + b.await.unwrap().sent;
        assert_eq!(total, 1);
        assert_eq!(transport.pushed.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, Default)]
    struct SlowTransport {
        pushed: AtomicU32,
    }

    impl ReminderTransport for Arc<SlowTransport> {
        async fn push(&self, _event: &roster_types::Event) -> Result<(), TransportError> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.pushed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stores_sharing_a_backend_send_once() {
        let repo = MemoryRepository::new();
        let config = RosterConfig::default();
        let a = EventStore::open(repo.clone().into(), &config).await.unwrap();
        let b = EventStore::open(repo.into(), &config).await.unwrap();
        let draft = EventDraft {
            kind: EventKind::Standard,
            title: String::from("Weekend badminton"),
            location: String::from("Court 10"),
            window: EventWindow {
                start: start(),
                end: start() + TimeDelta::hours(2),
            },
            capacity: Some(8),
            waitlist_capacity: None,
            signup_cutoff_minutes: None,
        };
        let (event, _) = a
            .create(ScopeId::new("group"), draft, start() - TimeDelta::days(1))
            .await
            .unwrap();

        let transport = Arc::new(SlowTransport::default());
        let scheduler_a = ReminderScheduler::new(a.clone(), Arc::clone(&transport), 60);
        let scheduler_b = ReminderScheduler::new(b, Arc::clone(&transport), 60);
        let now = start() - TimeDelta::minutes(20);

        let (report_a, report_b) = tokio::join!(scheduler_a.tick(now), scheduler_b.tick(now));
        let (report_a, report_b) = (report_a.unwrap(), report_b.unwrap());
        assert_eq!(report_a.sent + report_b.sent, 1);
        assert_eq!(report_a.failed + report_b.failed, 0);
        assert_eq!(transport.pushed.load(Ordering::SeqCst), 1);

        let stored = a.repository().load(event.id).await.unwrap().unwrap().value;
        assert_eq!(stored.reminder.sent_at, Some(now));
    }

    #[tokio::test]
    async fn failed_push_releases_claim() {
        let (store, id, transport) = setup().await;
        let scheduler = ReminderScheduler::new(store.clone(), Arc::clone(&transport), 60);
        transport.failing.store(true, Ordering::SeqCst);

        let report = scheduler.tick(start() - TimeDelta::minutes(15)).await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 1);
        let stored = store.repository().load(id).await.unwrap().unwrap().value;
        assert!(!stored.reminder.sent);
        assert_eq!(stored.reminder.sent_at, None);
    }

    #[tokio::test]
    async fn expired_event_locks_are_pruned() {
        let (store, _, transport) = setup().await;
        let scheduler = ReminderScheduler::new(store.clone(), transport, 60);

        scheduler.tick(start() - TimeDelta::minutes(30)).await.unwrap();
        assert_eq!(store.lock_slots().await, 1);

        scheduler.tick(start() + TimeDelta::hours(3)).await.unwrap();
        assert_eq!(store.lock_slots().await, 0);
    }

    #[tokio::test]
    async fn reminder_is_audited() {
        let (store, id, transport) = setup().await;
        let mut audit_rx = store.subscribe();
        let scheduler = ReminderScheduler::new(store, transport, 60);
        scheduler.tick(start() - TimeDelta::minutes(5)).await.unwrap();

        let record = audit_rx.try_recv().unwrap();
        assert_eq!(record.action, AuditAction::ReminderSent);
        assert_eq!(record.event_id, Some(id));
    }

    #[tokio::test]
    async fn expired_events_are_never_reminded() {
        let (store, _, transport) = setup().await;
        let scheduler = ReminderScheduler::new(store, Arc::clone(&transport), 60);
        let report = scheduler.tick(start() + TimeDelta::hours(3)).await.unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(transport.pushed.load(Ordering::SeqCst), 0);
    }
}
