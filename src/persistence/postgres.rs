//! PostgreSQL implementation of the event store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{EVENT_COLUMNS, EventRow};
use super::{EventQuery, EventStore};
use crate::config::ServiceConfig;
use crate::domain::{Event, EventId, NewEvent, Route};
use crate::error::ServiceError;

/// Opens a connection pool sized from the service configuration.
///
/// # Errors
///
/// Returns [`ServiceError::PersistenceError`] if the database cannot be
/// reached within the configured timeout.
pub async fn connect(config: &ServiceConfig) -> Result<PgPool, ServiceError> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .map_err(|e| ServiceError::PersistenceError(e.to_string()))
}

/// Applies the embedded `migrations/` to the database.
///
/// # Errors
///
/// Returns [`ServiceError::PersistenceError`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), ServiceError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ServiceError::PersistenceError(e.to_string()))
}

/// PostgreSQL-backed event store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn rows_to_events(rows: Vec<EventRow>) -> Result<Vec<Event>, ServiceError> {
    rows.into_iter().map(Event::try_from).collect()
}

impl EventStore for PostgresEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, ServiceError> {
        let id = EventId::new();
        sqlx::query(
            "INSERT INTO notification_events \
             (id, origin, dest, event_type, severity, delta_pct, zscore, today_price, \
              window_start, window_end, observed_at, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*id.as_uuid())
        .bind(event.route.origin())
        .bind(event.route.dest())
        .bind(event.event_type.as_str())
        .bind(event.severity.as_str())
        .bind(event.delta_pct)
        .bind(event.zscore)
        .bind(event.today_price)
        .bind(event.window_start)
        .bind(event.window_end)
        .bind(event.observed_at)
        .bind(&event.meta)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::PersistenceError(e.to_string()))?;

        Ok(Event::from_new(id, event))
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>, ServiceError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM notification_events \
             WHERE observed_at >= $1 ORDER BY observed_at ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ServiceError::PersistenceError(e.to_string()))?;

        rows_to_events(rows)
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, ServiceError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM notification_events \
             WHERE ($1::text IS NULL OR origin = $1) \
               AND ($2::text IS NULL OR dest = $2) \
               AND ($3::timestamptz IS NULL OR observed_at >= $3) \
             ORDER BY observed_at DESC LIMIT $4"
        );
        let limit = i64::try_from(query.clamped_limit()).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(query.route.as_ref().map(Route::origin))
            .bind(query.route.as_ref().map(Route::dest))
            .bind(query.since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ServiceError::PersistenceError(e.to_string()))?;

        rows_to_events(rows)
    }

    async fn has_event_since(
        &self,
        route: &Route,
        since: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM notification_events \
             WHERE origin = $1 AND dest = $2 AND observed_at >= $3)",
        )
        .bind(route.origin())
        .bind(route.dest())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ServiceError::PersistenceError(e.to_string()))
    }
}
