//! Where reminders go.
//!
//! [`ReminderTransport`] is the seam the scheduler is generic over; tests
//! plug in their own. The engine picks between the two shipped
//! implementations at startup through the [`Transport`] enum, because
//! async methods are not dyn-compatible.

use chrono::FixedOffset;
use serde::Serialize;

use roster_core::render;
use roster_types::{Event, EventId, ScopeId};

/// Errors from pushing a reminder.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request could not be made.
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The receiver answered with a non-success status.
    #[error("webhook returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The transport refused the reminder for another reason.
    #[error("reminder rejected: {0}")]
    Rejected(String),
}

/// Delivers a reminder for one event.
pub trait ReminderTransport: Send + Sync {
    /// Push the reminder. An error leaves the reminder unsent so the next
    /// tick retries it.
    fn push(
        &self,
        event: &Event,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// JSON body posted by [`WebhookTransport`].
#[derive(Debug, Serialize)]
struct ReminderPayload<'a> {
    event_id: EventId,
    scope: &'a ScopeId,
    title: &'a str,
    location: &'a str,
    start: chrono::DateTime<chrono::Utc>,
    participant_total: u32,
    waitlist_total: u32,
    text: String,
}

/// POSTs a JSON reminder to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
    offset: FixedOffset,
}

impl WebhookTransport {
    /// Create a transport posting to `url`, rendering times in `offset`.
    pub fn new(url: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            offset,
        }
    }
}

impl ReminderTransport for WebhookTransport {
    async fn push(&self, event: &Event) -> Result<(), TransportError> {
        let payload = ReminderPayload {
            event_id: event.id,
            scope: &event.scope,
            title: &event.title,
            location: &event.location,
            start: event.window.start,
            participant_total: event.participant_total(),
            waitlist_total: event.waitlist_total(),
            text: render::reminder_text(event, self.offset),
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(event_id = %event.id, url = %self.url, "Reminder posted");
        Ok(())
    }
}

/// Writes the reminder to the log and nothing else.
#[derive(Debug, Clone, Copy)]
pub struct LogTransport {
    offset: FixedOffset,
}

impl LogTransport {
    /// Create a transport rendering times in `offset`.
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl ReminderTransport for LogTransport {
    async fn push(&self, event: &Event) -> Result<(), TransportError> {
        tracing::info!(
            target: "roster::reminder",
            event_id = %event.id,
            scope = %event.scope,
            text = %render::reminder_text(event, self.offset),
            "Reminder"
        );
        Ok(())
    }
}

/// The transports the engine can be configured with.
#[derive(Debug, Clone)]
pub enum Transport {
    /// HTTP webhook.
    Webhook(WebhookTransport),
    /// Log only.
    Log(LogTransport),
}

impl Transport {
    /// Webhook if `webhook_url` is non-empty, log otherwise.
    pub fn from_url(webhook_url: &str, offset: FixedOffset) -> Self {
        if webhook_url.trim().is_empty() {
            Self::Log(LogTransport::new(offset))
        } else {
            Self::Webhook(WebhookTransport::new(webhook_url.trim(), offset))
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Webhook(_) => "webhook",
            Self::Log(_) => "log",
        }
    }
}

impl ReminderTransport for Transport {
    async fn push(&self, event: &Event) -> Result<(), TransportError> {
        match self {
            Self::Webhook(transport) => transport.push(event).await,
            Self::Log(transport) => transport.push(event).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use roster_core::render::offset_from_minutes;

    use super::*;

    #[test]
    fn empty_url_means_log_only() {
        let offset = offset_from_minutes(480);
        assert_eq!(Transport::from_url("", offset).name(), "log");
        assert_eq!(Transport::from_url("   ", offset).name(), "log");
        assert_eq!(
            Transport::from_url("http://localhost:9/hook", offset).name(),
            "webhook"
        );
    }
}
