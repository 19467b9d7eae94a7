//! Persistence layer: the append-only notification event store.
//!
//! [`EventStore`] is the seam between the pipeline and storage. Two
//! backends implement it: [`memory::MemoryEventStore`] for tests and
//! store-less deployments, and [`postgres::PostgresEventStore`] backed by
//! `sqlx::PgPool`. [`StoreBackend`] selects between them at startup.
//!
//! The store only appends and reads; there is no update or delete path.

pub mod memory;
pub mod models;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::domain::{Event, NewEvent, Route};
use crate::error::ServiceError;

pub use memory::MemoryEventStore;
pub use postgres::PostgresEventStore;

/// Upper bound on rows returned by [`EventStore::query`].
pub const MAX_QUERY_LIMIT: usize = 500;

/// Filter for reading the event log back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Restrict to one route.
    pub route: Option<Route>,
    /// Only events observed at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum rows, clamped to `1..=MAX_QUERY_LIMIT`.
    pub limit: usize,
}

impl EventQuery {
    /// Effective row limit after clamping.
    #[must_use]
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, MAX_QUERY_LIMIT)
    }
}

/// Append-only storage for notification events.
///
/// Inserts are self-contained, so concurrent writers need no
/// coordination. Reads may miss an insert that lands concurrently.
pub trait EventStore: Send + Sync {
    /// Writes one event and returns it with its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the write fails.
    fn insert(&self, event: NewEvent) -> impl Future<Output = Result<Event, ServiceError>> + Send;

    /// Returns every event with `observed_at >= since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the read fails.
    fn events_since(
        &self,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Event>, ServiceError>> + Send;

    /// Returns events matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the read fails.
    fn query(
        &self,
        query: &EventQuery,
    ) -> impl Future<Output = Result<Vec<Event>, ServiceError>> + Send;

    /// Returns `true` if `route` has any event with `observed_at >= since`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the read fails.
    fn has_event_since(
        &self,
        route: &Route,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, ServiceError>> + Send;
}

/// Event store selected at startup.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Process-local store.
    Memory(MemoryEventStore),
    /// PostgreSQL `notification_events` table.
    Postgres(PostgresEventStore),
}

impl EventStore for StoreBackend {
    async fn insert(&self, event: NewEvent) -> Result<Event, ServiceError> {
        match self {
            Self::Memory(store) => store.insert(event).await,
            Self::Postgres(store) => store.insert(event).await,
        }
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>, ServiceError> {
        match self {
            Self::Memory(store) => store.events_since(since).await,
            Self::Postgres(store) => store.events_since(since).await,
        }
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, ServiceError> {
        match self {
            Self::Memory(store) => store.query(query).await,
            Self::Postgres(store) => store.query(query).await,
        }
    }

    async fn has_event_since(
        &self,
        route: &Route,
        since: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        match self {
            Self::Memory(store) => store.has_event_since(route, since).await,
            Self::Postgres(store) => store.has_event_since(route, since).await,
        }
    }
}

impl From<MemoryEventStore> for StoreBackend {
    fn from(store: MemoryEventStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresEventStore> for StoreBackend {
    fn from(store: PostgresEventStore) -> Self {
        Self::Postgres(store)
    }
}
