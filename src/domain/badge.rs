//! Windowed badge aggregation.
//!
//! A badge is a derived summary of one route's recent events. It is
//! never stored or patched: [`aggregate`] recomputes every badge from the
//! events in the window each time it runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::event::{Event, EventType, Severity};

/// At-a-glance state of one route over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Badge {
    /// Route origin.
    pub origin: String,
    /// Route destination.
    pub dest: String,
    /// Most recent `observed_at` in the window.
    pub last_seen: DateTime<Utc>,
    /// Deepest in-window price drop (most negative `delta_pct`).
    pub drop_pct: Option<f64>,
    /// Whether any in-window event reports an open booking window.
    pub window_open: bool,
    /// Highest severity among in-window drops and spikes.
    pub top_severity: Option<Severity>,
}

/// Every badge produced by one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BadgeSnapshot {
    /// Instant the window was anchored to.
    pub refreshed_at: DateTime<Utc>,
    /// Inclusive lower bound of the window.
    pub window_start: DateTime<Utc>,
    /// Badges sorted by `(origin, dest)`.
    pub badges: Vec<Badge>,
}

impl BadgeSnapshot {
    /// Snapshot with no badges, used before the first refresh completes.
    #[must_use]
    pub fn empty(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            refreshed_at: now,
            window_start: now - window,
            badges: Vec::new(),
        }
    }

    /// Looks up the badge for one route.
    #[must_use]
    pub fn get(&self, origin: &str, dest: &str) -> Option<&Badge> {
        self.badges
            .iter()
            .find(|b| b.origin == origin && b.dest == dest)
    }
}

/// Collapses `events` into one badge per route for the window ending at
/// `now`.
///
/// Events older than `now - window` are ignored. Routes with no in-window
/// event produce no badge. The result depends only on the inputs, so
/// running it twice over the same events gives the same snapshot.
#[must_use]
pub fn aggregate(events: &[Event], now: DateTime<Utc>, window: Duration) -> BadgeSnapshot {
    let window_start = now - window;
    let mut by_route: BTreeMap<(&str, &str), Badge> = BTreeMap::new();

    for event in events.iter().filter(|e| e.observed_at >= window_start) {
        let badge = by_route
            .entry((event.origin.as_str(), event.dest.as_str()))
            .or_insert_with(|| Badge {
                origin: event.origin.clone(),
                dest: event.dest.clone(),
                last_seen: event.observed_at,
                drop_pct: None,
                window_open: false,
                top_severity: None,
            });
        fold_event(badge, event);
    }

    BadgeSnapshot {
        refreshed_at: now,
        window_start,
        badges: by_route.into_values().collect(),
    }
}

fn fold_event(badge: &mut Badge, event: &Event) {
    badge.last_seen = badge.last_seen.max(event.observed_at);

    match event.event_type {
        EventType::PriceDrop => {
            if let Some(delta) = event.delta_pct.filter(|d| d.is_finite()) {
                badge.drop_pct = Some(badge.drop_pct.map_or(delta, |d| d.min(delta)));
            }
        }
        EventType::WindowOpen => badge.window_open = true,
        EventType::PriceSpike | EventType::TrendReversal => {}
    }

    if event.event_type.is_price_move() {
        badge.top_severity = badge.top_severity.max(Some(event.severity));
    }
}
