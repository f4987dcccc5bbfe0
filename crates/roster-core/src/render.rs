//! Plain-text roster cards.
//!
//! Chat adapters and the reminder webhook both want a compact,
//! human-readable view of an event. Times are shown in the configured
//! local offset.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use roster_types::{Event, Registration};

/// Upper bound on rendered card length, in characters.
pub const MAX_CARD_CHARS: usize = 4900;

fn local(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    at.with_timezone(&offset)
}

/// Resolve a minute offset into a [`FixedOffset`], falling back to UTC
/// when out of range.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn push_entries(out: &mut String, entries: &[Registration]) {
    for (position, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} (+{}){}",
            position.saturating_add(1),
            entry.display_name,
            entry.quantity,
            if entry.priority { " *" } else { "" }
        );
    }
}

/// Render the full roster: header, confirmed list, and waitlist if any.
pub fn roster_card(event: &Event, offset: FixedOffset) -> String {
    let start = local(event.window.start, offset);
    let end = local(event.window.end, offset);

    let mut out = String::new();
    let _ = writeln!(out, "{}", event.title);
    let _ = writeln!(out, "{}", start.format("%-m/%-d (%a)"));
    let _ = writeln!(out, "{}-{}", start.format("%H:%M"), end.format("%H:%M"));
    if !event.location.is_empty() {
        let _ = writeln!(out, "{}", event.location);
    }
    out.push_str("====================\n");
    let _ = writeln!(
        out,
        "Confirmed ({}/{}):",
        event.participant_total(),
        event.capacity
    );
    if event.participants.is_empty() {
        out.push_str("(nobody yet)\n");
    } else {
        push_entries(&mut out, &event.participants);
    }
    if !event.waitlist.is_empty() {
        out.push_str("--------------------\n");
        out.push_str("Waitlist:\n");
        push_entries(&mut out, &event.waitlist);
    }

    truncate_chars(out.trim_end(), MAX_CARD_CHARS)
}

/// Render the reminder text pushed shortly before an event starts.
pub fn reminder_text(event: &Event, offset: FixedOffset) -> String {
    let start = local(event.window.start, offset);
    let mut out = format!(
        "Reminder: {} starts at {}",
        event.title,
        start.format("%-m/%-d %H:%M")
    );
    if !event.location.is_empty() {
        let _ = write!(out, " at {}", event.location);
    }
    out.push_str("\n\n");
    out.push_str(&roster_card(event, offset));
    truncate_chars(&out, MAX_CARD_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
