//! `PostgreSQL` repository.
//!
//! Each event is one row: the aggregate itself as `JSONB`, plus the
//! columns needed to filter without decoding it (`scope`, the window
//! bounds) and a `version` token. Saves are compare-and-swap on that
//! token, which is what keeps several engine processes from overwriting
//! each other.
//!
//! Queries are built at runtime, so no database is needed at build time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use roster_types::{CoreMember, Event, EventId, ScopeId, SubjectId};

use crate::error::DbError;
use crate::repository::{SaveOutcome, Versioned};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// A versioned row from `roster_events`.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    version: i64,
    body: serde_json::Value,
}

impl EventRow {
    fn decode(self) -> Result<Versioned<Event>, DbError> {
        Ok(Versioned {
            value: serde_json::from_value(self.body)?,
            version: u64::try_from(self.version).unwrap_or(0),
        })
    }
}

/// A row from `core_members`.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    subject: String,
    display_name: String,
}

fn decode_events(rows: Vec<EventRow>) -> Result<Vec<Event>, DbError> {
    rows.into_iter()
        .map(|row| row.decode().map(|v| v.value))
        .collect()
}

fn to_db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

/// Event and membership persistence in `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// [`DbError::Config`] for a malformed URL, [`DbError::Postgres`] if
    /// the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create or upgrade `roster_events` and `core_members`.
    ///
    /// # Errors
    ///
    /// [`DbError::Migration`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }

    pub(crate) async fn insert(&self, event: &Event) -> Result<u64, DbError> {
        let body = serde_json::to_value(event)?;
        let result = sqlx::query(
            r"INSERT INTO roster_events (id, scope, window_start, window_end, version, body, created_at)
              VALUES ($1, $2, $3, $4, 1, $5, $6)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(event.id.into_inner())
        .bind(event.scope.as_str())
        .bind(event.window.start)
        .bind(event.window.end)
        .bind(&body)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Duplicate(event.id));
        }
        Ok(1)
    }

    pub(crate) async fn load(&self, id: EventId) -> Result<Option<Versioned<Event>>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"SELECT version, body FROM roster_events WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRow::decode).transpose()
    }

    pub(crate) async fn save(&self, event: &Event, expected: u64) -> Result<SaveOutcome, DbError> {
        let body = serde_json::to_value(event)?;
        let next: Option<i64> = sqlx::query_scalar(
            r"UPDATE roster_events
              SET body = $3, window_start = $4, window_end = $5, version = version + 1
              WHERE id = $1 AND version = $2
              RETURNING version",
        )
        .bind(event.id.into_inner())
        .bind(to_db_version(expected))
        .bind(&body)
        .bind(event.window.start)
        .bind(event.window.end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(next.map_or(SaveOutcome::Stale, |v| {
            SaveOutcome::Committed(u64::try_from(v).unwrap_or(0))
        }))
    }

    pub(crate) async fn delete(&self, id: EventId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM roster_events WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn list_scope(&self, scope: &ScopeId) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT version, body FROM roster_events
              WHERE scope = $1
              ORDER BY window_start, id",
        )
        .bind(scope.as_str())
        .fetch_all(&self.pool)
        .await?;
        decode_events(rows)
    }

    pub(crate) async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT version, body FROM roster_events
              WHERE window_end > $1
              ORDER BY window_start, id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        decode_events(rows)
    }

    pub(crate) async fn list_members(&self) -> Result<Vec<CoreMember>, DbError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r"SELECT subject, display_name FROM core_members ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| CoreMember {
                subject: SubjectId::new(row.subject),
                display_name: row.display_name,
            })
            .collect())
    }

    pub(crate) async fn add_member(&self, member: &CoreMember) -> Result<bool, DbError> {
        // xmax is zero only for freshly inserted tuples.
        let inserted: bool = sqlx::query_scalar(
            r"INSERT INTO core_members (subject, display_name)
              VALUES ($1, $2)
              ON CONFLICT (subject) DO UPDATE SET display_name = EXCLUDED.display_name
              RETURNING (xmax = 0)",
        )
        .bind(member.subject.as_str())
        .bind(&member.display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    pub(crate) async fn remove_member(&self, subject: &SubjectId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM core_members WHERE subject = $1")
            .bind(subject.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
