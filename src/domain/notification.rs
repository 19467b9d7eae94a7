//! Notifications broadcast after the pipeline changes state.
//!
//! Every inserted event, badge refresh and finished scheduler run emits a
//! [`Notification`] through the [`super::EventBus`]. WebSocket clients
//! receive them filtered by route.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::Event;

/// Domain notification emitted by the scheduler and badge refresher.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A new event was written to the store.
    EventRecorded {
        /// The stored event.
        event: Event,
    },

    /// The badge view was re-derived.
    BadgesRefreshed {
        /// Number of routes with a badge.
        badge_count: usize,
        /// Window anchor of the new snapshot.
        refreshed_at: DateTime<Utc>,
    },

    /// A scheduler pass finished (cleanly or with per-route failures).
    SchedulerRunCompleted {
        /// Routes evaluated.
        evaluated: usize,
        /// Events inserted.
        emitted: usize,
        /// Routes whose data fetch failed.
        failed_routes: usize,
        /// Completion timestamp.
        finished_at: DateTime<Utc>,
    },
}

impl Notification {
    /// Returns the `ORIGIN-DEST` key for route-scoped notifications.
    ///
    /// Global notifications return `None` and are delivered to every
    /// subscriber.
    #[must_use]
    pub fn route_key(&self) -> Option<String> {
        match self {
            Self::EventRecorded { event } => Some(event.route_key()),
            Self::BadgesRefreshed { .. } | Self::SchedulerRunCompleted { .. } => None,
        }
    }

    /// Returns the notification kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::EventRecorded { .. } => "event_recorded",
            Self::BadgesRefreshed { .. } => "badges_refreshed",
            Self::SchedulerRunCompleted { .. } => "scheduler_run_completed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::event::{EventType, NewEvent, Severity};
    use crate::domain::{EventId, Route};

    fn recorded() -> Notification {
        let Ok(route) = Route::new("JFK", "LHR") else {
            panic!("valid route");
        };
        Notification::EventRecorded {
            event: Event::from_new(
                EventId::new(),
                NewEvent {
                    route,
                    event_type: EventType::PriceDrop,
                    severity: Severity::Alert,
                    delta_pct: Some(-15.0),
                    zscore: None,
                    today_price: Some(85.0),
                    window_start: None,
                    window_end: None,
                    observed_at: Utc::now(),
                    meta: serde_json::json!({ "baseline": 100.0 }),
                },
            ),
        }
    }

    #[test]
    fn event_recorded_is_route_scoped() {
        let n = recorded();
        assert_eq!(n.kind_str(), "event_recorded");
        assert_eq!(n.route_key().as_deref(), Some("JFK-LHR"));
    }

    #[test]
    fn refresh_is_global() {
        let n = Notification::BadgesRefreshed {
            badge_count: 3,
            refreshed_at: Utc::now(),
        };
        assert_eq!(n.route_key(), None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&recorded()).unwrap_or_default();
        assert!(json.contains("\"kind\":\"event_recorded\""));
        assert!(json.contains("price_drop"));
    }
}
