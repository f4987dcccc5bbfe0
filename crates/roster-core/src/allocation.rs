//! Seat allocation against a single event aggregate.
//!
//! All functions here are pure with respect to the outside world: they
//! take the event by mutable reference, the instant to evaluate at, and
//! the membership registry, and either apply a complete change or return
//! an error without touching the event.
//!
//! # Containers
//!
//! - `participants` -- confirmed seats, in arrival order.
//! - `waitlist` -- overflow seats, strict FIFO.
//!
//! A subject has at most one entry per container. Admission fills free
//! confirmed seats first and queues the rest, so a subject can hold a
//! confirmed entry and an overflow entry at the same time. Withdrawal
//! drains the overflow entry first, then the confirmed one, and then
//! promotes from the head of the waitlist until capacity is full again.

use chrono::{DateTime, Utc};

use roster_types::{
    AdmitResult, Event, Promotion, Registration, SubjectId, WithdrawResult,
};

use crate::error::RosterError;
use crate::lifecycle;
use crate::membership::CoreMembershipRegistry;

/// What a set-total request turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    /// The subject wanted more seats than they held.
    Admitted(AdmitResult),
    /// The subject wanted fewer seats than they held.
    Withdrawn(WithdrawResult),
    /// The subject already held exactly the requested total.
    Unchanged,
}

/// Request `n` seats for `subject`.
///
/// Free confirmed seats are granted first (merged into the subject's
/// existing entry, or appended at the tail). The remainder is queued on
/// the waitlist up to its capacity, and anything beyond that is reported
/// as rejected and not stored.
///
/// # Errors
///
/// - [`RosterError::InvalidQuantity`] if `n` is zero.
/// - Any gating error from [`lifecycle::check_admission`].
pub fn admit(
    event: &mut Event,
    subject: &SubjectId,
    display_name: &str,
    n: u32,
    now: DateTime<Utc>,
    registry: &CoreMembershipRegistry,
) -> Result<AdmitResult, RosterError> {
    if n == 0 {
        return Err(RosterError::InvalidQuantity);
    }
    lifecycle::check_admission(event, subject, now, registry)?;

    let to_main = n.min(event.available_seats());
    if to_main > 0 {
        merge_or_append(&mut event.participants, subject, display_name, to_main, false);
    }

    let leftover = n.saturating_sub(to_main);
    let mut wait_added = 0;
    if leftover > 0 {
        let room = event
            .waitlist_capacity
            .map_or(leftover, |cap| cap.saturating_sub(event.waitlist_total()));
        wait_added = leftover.min(room);
        if wait_added > 0 {
            merge_or_append(&mut event.waitlist, subject, display_name, wait_added, false);
        }
    }

    let result = AdmitResult {
        main_added: to_main,
        wait_added,
        rejected: leftover.saturating_sub(wait_added),
    };
    tracing::debug!(
        event_id = %event.id,
        subject = %subject,
        requested = n,
        main_added = result.main_added,
        wait_added = result.wait_added,
        rejected = result.rejected,
        "Admission applied"
    );
    Ok(result)
}

/// Release up to `n` seats held by `subject`, then promote from the
/// waitlist into the freed capacity.
///
/// Seats are taken from the subject's waitlist entry first and from the
/// confirmed entry second. Releasing more than the subject holds simply
/// releases everything.
///
/// # Errors
///
/// - [`RosterError::InvalidQuantity`] if `n` is zero.
/// - [`RosterError::EventExpired`] once the window has ended.
/// - [`RosterError::NotRegistered`] if the subject holds no seats.
pub fn withdraw(
    event: &mut Event,
    subject: &SubjectId,
    n: u32,
    now: DateTime<Utc>,
) -> Result<WithdrawResult, RosterError> {
    if n == 0 {
        return Err(RosterError::InvalidQuantity);
    }
    lifecycle::check_withdrawal(event, now)?;
    if event.holding(subject) == 0 {
        return Err(RosterError::NotRegistered);
    }

    let from_waitlist = deduct(&mut event.waitlist, subject, n);
    let from_main = deduct(&mut event.participants, subject, n.saturating_sub(from_waitlist));
    let promoted = promote(event);

    tracing::debug!(
        event_id = %event.id,
        subject = %subject,
        from_waitlist,
        from_main,
        promotions = promoted.len(),
        "Withdrawal applied"
    );
    Ok(WithdrawResult {
        from_waitlist,
        from_main,
        promoted,
    })
}

/// Fill free confirmed seats from the head of the waitlist.
///
/// The head entry moves as many seats as fit. If it empties, it is
/// removed and the next entry is considered; if it does not, the
/// remainder keeps its place at the head and promotion stops because
/// capacity is full.
pub fn promote(event: &mut Event) -> Vec<Promotion> {
    let mut promotions = Vec::new();
    loop {
        let free = event.available_seats();
        if free == 0 {
            break;
        }
        let Some(head) = event.waitlist.first_mut() else {
            break;
        };

        let moved = head.quantity.min(free);
        head.quantity = head.quantity.saturating_sub(moved);
        let remaining = head.quantity;
        let subject = head.subject.clone();
        let display_name = head.display_name.clone();
        let priority = head.priority;

        if remaining == 0 {
            event.waitlist.remove(0);
        }
        merge_or_append(&mut event.participants, &subject, &display_name, moved, priority);
        promotions.push(Promotion {
            subject,
            quantity: moved,
            partial: remaining > 0,
        });

        if remaining > 0 {
            break;
        }
    }
    promotions
}

/// Make `subject` hold exactly `target` seats across both containers.
///
/// Delegates to [`admit`] or [`withdraw`] with the difference, so the
/// same gating applies: growing is refused after signup closes, while
/// shrinking is allowed until the event expires.
///
/// # Errors
///
/// Any error from [`admit`] or [`withdraw`]; additionally
/// [`RosterError::NotRegistered`] when both the current holding and the
/// target are zero, and [`RosterError::EventExpired`] for a no-op on an
/// expired event.
pub fn set_total(
    event: &mut Event,
    subject: &SubjectId,
    display_name: &str,
    target: u32,
    now: DateTime<Utc>,
    registry: &CoreMembershipRegistry,
) -> Result<Adjustment, RosterError> {
    let current = event.holding(subject);
    if target > current {
        let delta = target.saturating_sub(current);
        admit(event, subject, display_name, delta, now, registry).map(Adjustment::Admitted)
    } else if target < current {
        let delta = current.saturating_sub(target);
        withdraw(event, subject, delta, now).map(Adjustment::Withdrawn)
    } else {
        lifecycle::check_withdrawal(event, now)?;
        if current == 0 {
            return Err(RosterError::NotRegistered);
        }
        Ok(Adjustment::Unchanged)
    }
}

/// Add `quantity` seats to the subject's entry, appending a new tail
/// entry if there is none.
fn merge_or_append(
    entries: &mut Vec<Registration>,
    subject: &SubjectId,
    display_name: &str,
    quantity: u32,
    priority: bool,
) {
    if let Some(existing) = entries.iter_mut().find(|r| &r.subject == subject) {
        existing.quantity = existing.quantity.saturating_add(quantity);
        existing.priority |= priority;
    } else {
        entries.push(Registration {
            subject: subject.clone(),
            display_name: display_name.to_owned(),
            quantity,
            priority,
        });
    }
}

/// Take up to `amount` seats from the subject's entry, removing the entry
/// when it reaches zero. Returns the seats actually taken.
fn deduct(entries: &mut Vec<Registration>, subject: &SubjectId, amount: u32) -> u32 {
    if amount == 0 {
        return 0;
    }
    let Some(pos) = entries.iter().position(|r| &r.subject == subject) else {
        return 0;
    };
    let Some(entry) = entries.get_mut(pos) else {
        return 0;
    };
    let taken = entry.quantity.min(amount);
    entry.quantity = entry.quantity.saturating_sub(taken);
    if entry.quantity == 0 {
        entries.remove(pos);
    }
    taken
}
