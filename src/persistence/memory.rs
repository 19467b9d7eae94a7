//! In-process event store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{EventQuery, EventStore};
use crate::domain::{Event, EventId, NewEvent, Route};
use crate::error::ServiceError;

/// Event store holding events in a `Vec` behind a [`tokio::sync::RwLock`].
///
/// Cloning is cheap and every clone shares the same log. Events are kept
/// in insertion order and never modified.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<RwLock<Vec<Event>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent reads fail until reset. Used to exercise the
    /// fail-open paths of the badge refresher.
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent inserts fail until reset.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    fn check_reads(&self) -> Result<(), ServiceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ServiceError::PersistenceError(
                "event store read failed".to_string(),
            ));
        }
        Ok(())
    }
}

impl EventStore for MemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::PersistenceError(
                "event store write failed".to_string(),
            ));
        }
        let stored = Event::from_new(EventId::new(), event);
        self.events.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>, ServiceError> {
        self.check_reads()?;
        let events = self.events.read().await;
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| e.observed_at >= since)
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.observed_at);
        Ok(matched)
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, ServiceError> {
        self.check_reads()?;
        let events = self.events.read().await;
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| query.since.is_none_or(|since| e.observed_at >= since))
            .filter(|e| {
                query
                    .route
                    .as_ref()
                    .is_none_or(|r| e.origin == r.origin() && e.dest == r.dest())
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        matched.truncate(query.clamped_limit());
        Ok(matched)
    }

    async fn has_event_since(
        &self,
        route: &Route,
        since: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        self.check_reads()?;
        let events = self.events.read().await;
        Ok(events.iter().any(|e| {
            e.origin == route.origin() && e.dest == route.dest() && e.observed_at >= since
        }))
    }
}
