//! Roster engine binary.
//!
//! Wires configuration, the storage backend, the event store, the intent
//! API, and the reminder loop together, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `roster-config.yaml` (or `ROSTER_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured repository, running migrations for `PostgreSQL`
//! 4. Open the event store and merge configured core members
//! 5. Start the audit log subscriber
//! 6. Start the intent API server
//! 7. Start the reminder loop
//! 8. Wait for `Ctrl-C` or an API failure, then stop background tasks

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use roster_api::AppState;
use roster_core::clock::{Clock, SystemClock};
use roster_core::config::{LogFormat, LoggingConfig, ReminderConfig, RosterConfig, StoreBackend};
use roster_core::render::offset_from_minutes;
use roster_store::{
    EventStore, MemoryRepository, PostgresRepository, ReminderScheduler, Repository, Transport,
};
use roster_types::AuditRecord;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration path, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "roster-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so report later.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %config_source,
        backend = ?config.store.backend,
        quantity_mode = ?config.policy.quantity_mode,
        core_members = config.membership.core_members.len(),
        "roster-engine starting"
    );

    // 3-4. Storage and event store.
    let repository = open_repository(&config).await?;
    let store = EventStore::open(repository, &config).await?;
    info!(backend = store.repository().name(), "Event store open");

    // 5. Audit side channel.
    let audit_handle = spawn_audit_logger(store.subscribe());

    // 6. Intent API.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = Arc::new(AppState::with_clock(store.clone(), Arc::clone(&clock)));
    let mut api_handle = roster_api::spawn_api(&config.infrastructure, app_state).await?;

    // 7. Reminder loop.
    let reminder_handle = if config.reminder.enabled {
        let transport = Transport::from_url(
            &config.infrastructure.reminder_webhook_url,
            offset_from_minutes(config.policy.utc_offset_minutes),
        );
        info!(
            transport = transport.name(),
            lead_minutes = config.reminder.lead_minutes,
            interval_secs = config.reminder.tick_interval_secs,
            "Reminder loop started"
        );
        Some(spawn_reminder_loop(
            store.clone(),
            clock,
            transport,
            &config.reminder,
        ))
    } else {
        info!("Reminders disabled");
        None
    };

    // 8. Run until interrupted.
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(EngineError::Signal)?;
            info!("Shutdown requested");
        }
        result = &mut api_handle => {
            warn!(?result, "Roster API task ended unexpectedly");
        }
    }

    if let Some(handle) = reminder_handle {
        handle.abort();
    }
    api_handle.abort();
    audit_handle.abort();
    if let Repository::Postgres(repo) = store.repository() {
        repo.close().await;
    }

    info!("roster-engine shutdown complete");
    Ok(())
}

/// Load configuration from `ROSTER_CONFIG` or [`DEFAULT_CONFIG_PATH`].
///
/// A missing file falls back to defaults plus environment overrides.
/// Returns the config and a description of where it came from.
fn load_config() -> Result<(RosterConfig, String), EngineError> {
    let path = std::env::var("ROSTER_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = RosterConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        let mut config = RosterConfig::default();
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok((config, String::from("defaults")))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Build the repository the config asks for.
async fn open_repository(config: &RosterConfig) -> Result<Repository, EngineError> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; events are lost on restart");
            Ok(MemoryRepository::new().into())
        }
        StoreBackend::Postgres => {
            let repo = PostgresRepository::connect(
                &config.infrastructure.postgres_url,
                config.store.max_connections,
            )
            .await?;
            repo.migrate().await?;
            info!("PostgreSQL migrations applied");
            Ok(repo.into())
        }
    }
}

/// Log every audit record under the `roster::audit` target.
fn spawn_audit_logger(mut rx: broadcast::Receiver<AuditRecord>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(record) => info!(
                    target: "roster::audit",
                    at = %record.at,
                    action = ?record.action,
                    scope = ?record.scope,
                    event_id = ?record.event_id,
                    subject = ?record.subject,
                    quantity = ?record.quantity,
                    "audit"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Audit subscriber lagged; records dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Tick the reminder scheduler on a fixed interval.
///
/// Missed ticks are skipped rather than replayed; each tick looks at the
/// full set of active events anyway.
fn spawn_reminder_loop(
    store: EventStore,
    clock: Arc<dyn Clock>,
    transport: Transport,
    config: &ReminderConfig,
) -> JoinHandle<()> {
    let scheduler = ReminderScheduler::new(store, transport, config.lead_minutes);
    let period = Duration::from_secs(config.tick_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(e) = scheduler.tick(clock.now()).await {
                warn!(error = %e, "Reminder tick failed");
            }
        }
    })
}
