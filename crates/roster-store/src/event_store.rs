//! The event store: atomic per-event transactions over a [`Repository`].
//!
//! # Concurrency
//!
//! ```text
//! transact(id, f)
//!   |
//!   +-- per-event tokio Mutex      (one mutator per event in this process)
//!   |
//!   +-- loop up to max_conflict_retries:
//!         load (event, version)
//!         f(&mut event)            (pure; an Err persists nothing)
//!         invariants::verify
//!         save(event, version)     (compare-and-swap across processes)
//!           Committed -> done
//!           Stale     -> retry
//! ```
//!
//! Every persisted mutation is announced as an [`AuditRecord`] on a
//! broadcast channel. Nobody is required to listen.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, broadcast};

use roster_core::allocation::{self, Adjustment};
use roster_core::config::{PolicyConfig, RosterConfig};
use roster_core::invariants::{self, InvariantResult};
use roster_core::membership::{CoreMembershipRegistry, SeedReport};
use roster_core::{RosterError, creation, lifecycle, render, selection};
use roster_types::{
    AdmitResult, AuditAction, AuditRecord, CoreMember, Event, EventDraft, EventId, EventSelector,
    EventSnapshot, Intent, IntentOutcome, Operation, QuantityMode, ScopeId, SubjectId,
    WithdrawResult,
};

use crate::error::StoreError;
use crate::repository::{Repository, SaveOutcome, Versioned};

/// Capacity of the audit broadcast channel.
const AUDIT_CHANNEL_CAPACITY: usize = 1024;

struct StoreInner {
    repository: Repository,
    policy: PolicyConfig,
    max_attempts: u32,
    locks: Mutex<HashMap<EventId, Arc<Mutex<()>>>>,
    registry: RwLock<CoreMembershipRegistry>,
    audit: broadcast::Sender<AuditRecord>,
}

/// Shared handle to the event store. Cheap to clone.
#[derive(Clone)]
pub struct EventStore {
    inner: Arc<StoreInner>,
}

impl core::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventStore")
            .field("repository", &self.inner.repository.name())
            .field("max_attempts", &self.inner.max_attempts)
            .finish_non_exhaustive()
    }
}

pub(crate) fn audit(at: DateTime<Utc>, action: AuditAction, event: Option<&Event>) -> AuditRecord {
    AuditRecord {
        at,
        scope: event.map(|e| e.scope.clone()),
        event_id: event.map(|e| e.id),
        subject: None,
        action,
        quantity: None,
    }
}

impl EventStore {
    /// Open a store over `repository`.
    ///
    /// Loads the persisted core membership and merges in
    /// `membership.core_members` from the configuration (existing members
    /// keep their position).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] if the membership cannot be read or written.
    pub async fn open(repository: Repository, config: &RosterConfig) -> Result<Self, StoreError> {
        for member in &config.membership.core_members {
            if repository.add_member(member).await? {
                tracing::info!(subject = %member.subject, "Seeded core member from config");
            }
        }
        let registry = CoreMembershipRegistry::from_members(repository.list_members().await?);
        tracing::info!(
            backend = repository.name(),
            core_members = registry.len(),
            "Event store opened"
        );

        let (audit, _) = broadcast::channel(AUDIT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(StoreInner {
                repository,
                policy: config.policy.clone(),
                max_attempts: config.store.max_conflict_retries.max(1),
                locks: Mutex::new(HashMap::new()),
                registry: RwLock::new(registry),
                audit,
            }),
        })
    }

    /// Subscribe to audit records for mutations persisted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.inner.audit.subscribe()
    }

    /// The backing repository.
    pub fn repository(&self) -> &Repository {
        &self.inner.repository
    }

    /// Admission and creation policy in effect.
    pub fn policy(&self) -> &PolicyConfig {
        &self.inner.policy
    }

    /// The local offset date selectors and rendering use.
    pub fn local_offset(&self) -> FixedOffset {
        render::offset_from_minutes(self.inner.policy.utc_offset_minutes)
    }

    pub(crate) fn emit(&self, record: AuditRecord) {
        // No receivers is fine.
        let _ = self.inner.audit.send(record);
    }

    pub(crate) async fn lock(&self, id: EventId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.inner.locks.lock().await;
            Arc::clone(locks.entry(id).or_default())
        };
        slot.lock_owned().await
    }

    /// Drop lock slots for events outside `keep` that nobody holds.
    /// Returns how many were dropped.
    pub(crate) async fn prune_locks(&self, keep: &HashSet<EventId>) -> usize {
        let mut locks = self.inner.locks.lock().await;
        let before = locks.len();
        locks.retain(|id, slot| keep.contains(id) || Arc::strong_count(slot) > 1);
        before.saturating_sub(locks.len())
    }

    #[cfg(test)]
    pub(crate) async fn lock_slots(&self) -> usize {
        self.inner.locks.lock().await.len()
    }

    async fn registry_snapshot(&self) -> CoreMembershipRegistry {
        self.inner.registry.read().await.clone()
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Apply `f` to event `id` atomically.
    ///
    /// Returns `f`'s output and the event as persisted. If `f` leaves the
    /// event unchanged nothing is written.
    ///
    /// # Errors
    ///
    /// - Whatever `f` returns, in which case nothing is persisted.
    /// - [`RosterError::EventNotFound`] if the event does not exist.
    /// - [`RosterError::Conflict`] once the retry budget is spent.
    /// - [`StoreError::Integrity`] if `f` broke an invariant.
    pub async fn transact<T, F>(&self, id: EventId, f: F) -> Result<(T, Event), StoreError>
    where
        F: FnMut(&mut Event) -> Result<T, RosterError> + Send,
        T: Send,
    {
        let _guard = self.lock(id).await;
        self.transact_locked(id, f).await
    }

    /// [`Self::transact`] for callers already holding the event's lock.
    pub(crate) async fn transact_locked<T, F>(
        &self,
        id: EventId,
        mut f: F,
    ) -> Result<(T, Event), StoreError>
    where
        F: FnMut(&mut Event) -> Result<T, RosterError> + Send,
        T: Send,
    {
        let mut attempts: u32 = 0;
        while attempts < self.inner.max_attempts {
            attempts = attempts.saturating_add(1);

            let Some(Versioned { value: loaded, version }) = self.inner.repository.load(id).await?
            else {
                return Err(RosterError::EventNotFound.into());
            };
            let mut event = loaded.clone();
            let output = f(&mut event)?;
            if event == loaded {
                return Ok((output, event));
            }

            if let InvariantResult::Violated(violations) = invariants::verify(&event) {
                tracing::error!(
                    event_id = %id,
                    violations = ?violations,
                    "Transaction would break event invariants; discarded"
                );
                return Err(StoreError::Integrity {
                    event_id: id,
                    violations,
                });
            }

            match self.inner.repository.save(&event, version).await? {
                SaveOutcome::Committed(new_version) => {
                    tracing::debug!(event_id = %id, version = new_version, attempts, "Event saved");
                    return Ok((output, event));
                }
                SaveOutcome::Stale => {
                    tracing::warn!(event_id = %id, attempt = attempts, "Version conflict, retrying");
                }
            }
        }
        Err(RosterError::Conflict {
            event_id: id,
            attempts,
        }
        .into())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Pick the event an intent targets within `scope`.
    ///
    /// # Errors
    ///
    /// [`RosterError::EventNotFound`] or [`RosterError::AmbiguousSelector`],
    /// or a repository failure.
    pub async fn resolve(
        &self,
        scope: &ScopeId,
        selector: &EventSelector,
        now: DateTime<Utc>,
    ) -> Result<EventId, StoreError> {
        let events = self.inner.repository.list_scope(scope).await?;
        Ok(selection::resolve(&events, selector, now, self.local_offset())?)
    }

    /// Open events in `scope`, earliest start first.
    ///
    /// # Errors
    ///
    /// Returns a repository failure.
    pub async fn list_open(
        &self,
        scope: &ScopeId,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventSnapshot>, StoreError> {
        let events = self.inner.repository.list_scope(scope).await?;
        Ok(selection::open_events(&events, now)
            .into_iter()
            .map(|event| EventSnapshot::new(event.clone(), lifecycle::status_of(event, now)))
            .collect())
    }

    /// One event in `scope`, with its status at `now`.
    ///
    /// # Errors
    ///
    /// [`RosterError::EventNotFound`] if the id is unknown or belongs to
    /// another scope, or a repository failure.
    pub async fn get(
        &self,
        scope: &ScopeId,
        id: EventId,
        now: DateTime<Utc>,
    ) -> Result<EventSnapshot, StoreError> {
        match self.inner.repository.load(id).await? {
            Some(Versioned { value, .. }) if &value.scope == scope => {
                let status = lifecycle::status_of(&value, now);
                Ok(EventSnapshot::new(value, status))
            }
            _ => Err(RosterError::EventNotFound.into()),
        }
    }

    /// Core members in registry order.
    pub async fn members(&self) -> Vec<CoreMember> {
        self.inner.registry.read().await.list().to_vec()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create an event from a draft, seeding core members if it is seasonal.
    ///
    /// # Errors
    ///
    /// [`RosterError::InvalidEvent`] or [`RosterError::EventExpired`] from
    /// validation, or a repository failure.
    pub async fn create(
        &self,
        scope: ScopeId,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<(Event, SeedReport), StoreError> {
        let registry = self.registry_snapshot().await;
        let (event, report) =
            creation::build_event(draft, scope, now, &self.inner.policy, &registry)?;
        self.inner.repository.insert(&event).await?;

        tracing::info!(
            event_id = %event.id,
            scope = %event.scope,
            start = %event.window.start,
            capacity = event.capacity,
            seeded = report.seeded(),
            "Event created"
        );
        self.emit(AuditRecord {
            quantity: Some(report.seeded()),
            ..audit(now, AuditAction::EventCreated, Some(&event))
        });
        Ok((event, report))
    }

    /// Request seats for `subject` in the selected event.
    ///
    /// Under [`QuantityMode::SetTotal`] the quantity is the subject's
    /// desired total, so this can release seats as well.
    ///
    /// # Errors
    ///
    /// Selection, gating, or quantity errors, or a repository failure.
    pub async fn admit(
        &self,
        scope: &ScopeId,
        selector: &EventSelector,
        subject: &SubjectId,
        display_name: &str,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<IntentOutcome, StoreError> {
        let n = creation::clamp_quantity(quantity, self.inner.policy.max_quantity_per_intent)?;
        let id = self.resolve(scope, selector, now).await?;
        let registry = self.registry_snapshot().await;
        let mode = self.inner.policy.quantity_mode;

        let (adjustment, event) = self
            .transact(id, |event| match mode {
                QuantityMode::Additive => {
                    allocation::admit(event, subject, display_name, n, now, &registry)
                        .map(Adjustment::Admitted)
                }
                QuantityMode::SetTotal => {
                    allocation::set_total(event, subject, display_name, n, now, &registry)
                }
            })
            .await?;

        match adjustment {
            Adjustment::Admitted(result) => {
                self.record_admission(&event, subject, result, now);
                Ok(IntentOutcome::Admitted {
                    result,
                    snapshot: Box::new(snapshot(event, now)),
                })
            }
            Adjustment::Withdrawn(result) => {
                self.record_withdrawal(&event, subject, &result, now);
                Ok(IntentOutcome::Withdrawn {
                    result,
                    snapshot: Box::new(snapshot(event, now)),
                })
            }
            Adjustment::Unchanged => Ok(IntentOutcome::Admitted {
                result: AdmitResult::default(),
                snapshot: Box::new(snapshot(event, now)),
            }),
        }
    }

    /// Release seats held by `subject` in the selected event and promote
    /// from the waitlist.
    ///
    /// # Errors
    ///
    /// Selection, gating, or quantity errors, or a repository failure.
    pub async fn withdraw(
        &self,
        scope: &ScopeId,
        selector: &EventSelector,
        subject: &SubjectId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<IntentOutcome, StoreError> {
        let n = creation::clamp_quantity(quantity, self.inner.policy.max_quantity_per_intent)?;
        let id = self.resolve(scope, selector, now).await?;

        let (result, event) = self
            .transact(id, |event| allocation::withdraw(event, subject, n, now))
            .await?;

        self.record_withdrawal(&event, subject, &result, now);
        Ok(IntentOutcome::Withdrawn {
            result,
            snapshot: Box::new(snapshot(event, now)),
        })
    }

    /// Remove the selected event.
    ///
    /// # Errors
    ///
    /// Selection errors, or a repository failure.
    pub async fn delete(
        &self,
        scope: &ScopeId,
        selector: &EventSelector,
        now: DateTime<Utc>,
    ) -> Result<EventId, StoreError> {
        let id = self.resolve(scope, selector, now).await?;
        let removed = {
            let _guard = self.lock(id).await;
            self.inner.repository.delete(id).await?
        };
        self.inner.locks.lock().await.remove(&id);
        if !removed {
            return Err(RosterError::EventNotFound.into());
        }

        tracing::info!(event_id = %id, scope = %scope, "Event deleted");
        self.emit(AuditRecord {
            scope: Some(scope.clone()),
            event_id: Some(id),
            ..audit(now, AuditAction::EventDeleted, None)
        });
        Ok(id)
    }

    /// Grant core membership. Returns `false` if the subject was already a
    /// member (its display name is refreshed).
    ///
    /// # Errors
    ///
    /// Returns a repository failure; the registry is left unchanged.
    pub async fn add_member(
        &self,
        subject: SubjectId,
        display_name: String,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let member = CoreMember {
            subject,
            display_name,
        };
        let mut registry = self.inner.registry.write().await;
        let added = self.inner.repository.add_member(&member).await?;
        registry.add(member.subject.clone(), member.display_name);

        if added {
            tracing::info!(subject = %member.subject, "Core member added");
            self.emit(AuditRecord {
                subject: Some(member.subject),
                ..audit(now, AuditAction::MemberAdded, None)
            });
        }
        Ok(added)
    }

    /// Revoke core membership. Returns `false` if the subject was not a member.
    ///
    /// # Errors
    ///
    /// Returns a repository failure; the registry is left unchanged.
    pub async fn remove_member(
        &self,
        subject: &SubjectId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut registry = self.inner.registry.write().await;
        let removed = self.inner.repository.remove_member(subject).await?;
        registry.remove(subject);

        if removed {
            tracing::info!(subject = %subject, "Core member removed");
            self.emit(AuditRecord {
                subject: Some(subject.clone()),
                ..audit(now, AuditAction::MemberRemoved, None)
            });
        }
        Ok(removed)
    }

    /// Apply a parsed intent.
    ///
    /// # Errors
    ///
    /// Any error from the operation the intent names.
    pub async fn apply(&self, intent: Intent) -> Result<IntentOutcome, StoreError> {
        let Intent {
            operation,
            scope,
            selector,
            subject,
            display_name,
            quantity,
            now,
        } = intent;
        let display_name = if display_name.trim().is_empty() {
            subject.as_str().to_owned()
        } else {
            display_name
        };

        match operation {
            Operation::Create(draft) => {
                let (event, report) = self.create(scope, draft, now).await?;
                Ok(IntentOutcome::Created {
                    snapshot: Box::new(snapshot(event, now)),
                    seeded: report.seeded(),
                    seed_skipped: report.skipped,
                })
            }
            Operation::Admit => {
                self.admit(&scope, &selector, &subject, &display_name, quantity, now)
                    .await
            }
            Operation::Withdraw => {
                self.withdraw(&scope, &selector, &subject, quantity, now)
                    .await
            }
            Operation::Delete => {
                let event_id = self.delete(&scope, &selector, now).await?;
                Ok(IntentOutcome::Deleted { event_id })
            }
            Operation::List => Ok(IntentOutcome::Listed {
                events: self.list_open(&scope, now).await?,
            }),
            Operation::AddMember => {
                let changed = self.add_member(subject, display_name, now).await?;
                Ok(IntentOutcome::Members {
                    members: self.members().await,
                    changed,
                })
            }
            Operation::RemoveMember => {
                let changed = self.remove_member(&subject, now).await?;
                Ok(IntentOutcome::Members {
                    members: self.members().await,
                    changed,
                })
            }
            Operation::ListMembers => Ok(IntentOutcome::Members {
                members: self.members().await,
                changed: false,
            }),
        }
    }

    fn record_admission(
        &self,
        event: &Event,
        subject: &SubjectId,
        result: AdmitResult,
        now: DateTime<Utc>,
    ) {
        tracing::info!(
            event_id = %event.id,
            subject = %subject,
            main_added = result.main_added,
            wait_added = result.wait_added,
            rejected = result.rejected,
            "Seats requested"
        );
        self.emit(AuditRecord {
            subject: Some(subject.clone()),
            quantity: Some(result.main_added.saturating_add(result.wait_added)),
            ..audit(now, AuditAction::Admitted, Some(event))
        });
    }

    fn record_withdrawal(
        &self,
        event: &Event,
        subject: &SubjectId,
        result: &WithdrawResult,
        now: DateTime<Utc>,
    ) {
        tracing::info!(
            event_id = %event.id,
            subject = %subject,
            released = result.released(),
            promotions = result.promoted.len(),
            "Seats released"
        );
        self.emit(AuditRecord {
            subject: Some(subject.clone()),
            quantity: Some(result.released()),
            ..audit(now, AuditAction::Withdrawn, Some(event))
        });
        for promotion in &result.promoted {
            self.emit(AuditRecord {
                subject: Some(promotion.subject.clone()),
                quantity: Some(promotion.quantity),
                ..audit(now, AuditAction::Promoted, Some(event))
            });
        }
    }
}

fn snapshot(event: Event, now: DateTime<Utc>) -> EventSnapshot {
    let status = lifecycle::status_of(&event, now);
    EventSnapshot::new(event, status)
}
