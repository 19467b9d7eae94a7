//! Badge service: serves the last good badge snapshot and re-derives it
//! from the event store on demand or on a timer.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::badge::aggregate;
use crate::domain::{Badge, BadgeSnapshot, EventBus, Notification, Route};
use crate::error::ServiceError;
use crate::persistence::{EventStore, StoreBackend};

/// Holds the current [`BadgeSnapshot`] and knows how to rebuild it.
///
/// Every refresh is a full re-derivation over the window. When the store
/// read fails, readers keep getting the previous snapshot.
#[derive(Debug)]
pub struct BadgeService {
    store: StoreBackend,
    event_bus: EventBus,
    window: Duration,
    /// Served to readers until the first refresh lands. Never compared
    /// against refreshed snapshots.
    placeholder: Arc<BadgeSnapshot>,
    current: RwLock<Option<Arc<BadgeSnapshot>>>,
}

impl BadgeService {
    /// Creates a service that serves an empty snapshot until its first
    /// refresh.
    #[must_use]
    pub fn new(store: StoreBackend, event_bus: EventBus, window: Duration) -> Self {
        Self {
            store,
            event_bus,
            window,
            placeholder: Arc::new(BadgeSnapshot::empty(Utc::now(), window)),
            current: RwLock::new(None),
        }
    }

    /// Aggregation window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Last successfully derived snapshot.
    pub async fn snapshot(&self) -> Arc<BadgeSnapshot> {
        match &*self.current.read().await {
            Some(snapshot) => Arc::clone(snapshot),
            None => Arc::clone(&self.placeholder),
        }
    }

    /// Badge for one route from the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadgeNotFound`] if the route had no events
    /// in the window at the last refresh.
    pub async fn badge(&self, route: &Route) -> Result<Badge, ServiceError> {
        self.snapshot()
            .await
            .get(route.origin(), route.dest())
            .cloned()
            .ok_or_else(|| ServiceError::BadgeNotFound(route.to_string()))
    }

    /// Re-derives the snapshot for the window ending now.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the store read fails;
    /// the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<BadgeSnapshot>, ServiceError> {
        self.refresh_at(Utc::now()).await
    }

    /// Re-derives the snapshot for the window ending at `now`.
    ///
    /// A snapshot anchored earlier than the one currently held is computed
    /// but not installed, so overlapping refreshes cannot move the view
    /// backwards. The returned snapshot is whichever one readers see after
    /// the call, and `BadgesRefreshed` is published only on install.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PersistenceError`] if the store read fails.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Arc<BadgeSnapshot>, ServiceError> {
        let events = match self.store.events_since(now - self.window).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "badge refresh failed; serving previous snapshot");
                return Err(e);
            }
        };

        let snapshot = Arc::new(aggregate(&events, now, self.window));
        {
            let mut current = self.current.write().await;
            if let Some(held) = current.as_ref()
                && held.refreshed_at > snapshot.refreshed_at
            {
                tracing::debug!(
                    held = %held.refreshed_at,
                    computed = %snapshot.refreshed_at,
                    "stale badge refresh discarded"
                );
                return Ok(Arc::clone(held));
            }
            *current = Some(Arc::clone(&snapshot));
        }

        tracing::debug!(
            badges = snapshot.badges.len(),
            events = events.len(),
            "badges refreshed"
        );
        let _ = self.event_bus.publish(Notification::BadgesRefreshed {
            badge_count: snapshot.badges.len(),
            refreshed_at: snapshot.refreshed_at,
        });

        Ok(snapshot)
    }

    /// Spawns a background task refreshing the snapshot every `interval`.
    ///
    /// The first refresh runs immediately.
    pub fn spawn_refresher(self: Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                // Failure already logged; the old snapshot stays live.
                let _ = self.refresh().await;
            }
        })
    }
}
