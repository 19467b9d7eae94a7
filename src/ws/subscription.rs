//! Per-connection subscription manager.
//!
//! Tracks which routes a WebSocket client is subscribed to and provides
//! server-side notification filtering.

use std::collections::HashSet;

use crate::domain::{Notification, Route};

/// Manages the set of route subscriptions for a single WebSocket
/// connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed `ORIGIN-DEST` keys. Ignored while `subscribe_all` is set.
    routes: HashSet<String>,
    /// Whether the client subscribes to every route (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds routes to the subscription set and optionally enables the
    /// wildcard.
    pub fn subscribe(&mut self, routes: &[Route], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        for route in routes {
            self.routes.insert(route.to_string());
        }
    }

    /// Removes routes from the subscription set and optionally drops the
    /// wildcard. Explicit routes subscribed alongside `"*"` stay.
    pub fn unsubscribe(&mut self, routes: &[Route], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for route in routes {
            self.routes.remove(&route.to_string());
        }
    }

    /// Returns `true` if the notification should be delivered.
    ///
    /// Global notifications are always delivered; route-scoped ones only
    /// when the route (or the wildcard) is subscribed.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        match notification.route_key() {
            None => true,
            Some(key) => self.subscribe_all || self.routes.contains(&key),
        }
    }

    /// Returns the number of explicitly subscribed routes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Event, EventId, EventType, NewEvent, Severity};
    use chrono::Utc;

    fn route(key: &str) -> Route {
        let Ok(route) = key.parse() else {
            panic!("valid route");
        };
        route
    }

    fn recorded(key: &str) -> Notification {
        Notification::EventRecorded {
            event: Event::from_new(
                EventId::new(),
                NewEvent {
                    route: route(key),
                    event_type: EventType::PriceDrop,
                    severity: Severity::Alert,
                    delta_pct: Some(-12.0),
                    zscore: None,
                    today_price: Some(88.0),
                    window_start: None,
                    window_end: None,
                    observed_at: Utc::now(),
                    meta: serde_json::json!({ "baseline": 100.0 }),
                },
            ),
        }
    }

    #[test]
    fn empty_matches_only_global() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(&recorded("JFK-LHR")));
        assert!(mgr.matches(&Notification::BadgesRefreshed {
            badge_count: 0,
            refreshed_at: Utc::now(),
        }));
    }

    #[test]
    fn subscribe_specific_route() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[route("JFK-LHR")], false);
        assert!(mgr.matches(&recorded("JFK-LHR")));
        assert!(!mgr.matches(&recorded("SFO-NRT")));
    }

    #[test]
    fn wildcard_matches_everything() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.is_subscribed_all());
        assert!(mgr.matches(&recorded("SFO-NRT")));
    }

    #[test]
    fn unsubscribe_removes_route() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[route("JFK-LHR"), route("SFO-NRT")], false);
        assert_eq!(mgr.count(), 2);
        mgr.unsubscribe(&[route("JFK-LHR")], false);
        assert!(!mgr.matches(&recorded("JFK-LHR")));
        assert_eq!(mgr.count(), 1);
    }

    #[test]
    fn unsubscribing_wildcard_keeps_explicit_routes() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[route("JFK-LHR")], true);
        assert!(mgr.matches(&recorded("SFO-NRT")));

        mgr.unsubscribe(&[], true);
        assert!(!mgr.is_subscribed_all());
        assert!(!mgr.matches(&recorded("SFO-NRT")));
        assert!(mgr.matches(&recorded("JFK-LHR")));
    }
}
