//! Notification events: the immutable records held by the event store.
//!
//! The classifier produces [`NewEvent`]s; the store assigns an
//! [`EventId`] on insert and hands back an [`Event`]. Neither is ever
//! mutated afterwards; a correction is a new event.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, Route};
use crate::error::ServiceError;

/// Kind of deviation or state change an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Price fell at least the alert band below baseline.
    PriceDrop,
    /// Price rose at least the alert band above baseline.
    PriceSpike,
    /// Price moved, but stayed inside the alert band.
    TrendReversal,
    /// A booking window for the route is open.
    WindowOpen,
}

impl EventType {
    /// Returns the stored string form (e.g. `"price_drop"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PriceDrop => "price_drop",
            Self::PriceSpike => "price_spike",
            Self::TrendReversal => "trend_reversal",
            Self::WindowOpen => "window_open",
        }
    }

    /// Returns `true` for the two types that carry a severity ranking in
    /// badges.
    #[must_use]
    pub const fn is_price_move(&self) -> bool {
        matches!(self, Self::PriceDrop | Self::PriceSpike)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_drop" => Ok(Self::PriceDrop),
            "price_spike" => Ok(Self::PriceSpike),
            "trend_reversal" => Ok(Self::TrendReversal),
            "window_open" => Ok(Self::WindowOpen),
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown event type: {other}"
            ))),
        }
    }
}

/// Ordered significance tier: `Info < Alert < Urgent`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    #[default]
    Info,
    /// Worth surfacing to the user.
    Alert,
    /// Act now.
    Urgent,
}

impl Severity {
    /// Returns the stored string form (e.g. `"urgent"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Alert => "alert",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "alert" => Ok(Self::Alert),
            "urgent" => Ok(Self::Urgent),
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown severity: {other}"
            ))),
        }
    }
}

/// An event that has been classified but not yet written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    /// Route the event belongs to.
    pub route: Route,
    /// Event kind.
    pub event_type: EventType,
    /// Significance tier.
    pub severity: Severity,
    /// Signed percentage deviation from baseline.
    pub delta_pct: Option<f64>,
    /// Standardised deviation score, when the baseline spread is known.
    pub zscore: Option<f64>,
    /// Price observed at evaluation time.
    pub today_price: Option<f64>,
    /// First day of the date range the event pertains to.
    pub window_start: Option<NaiveDate>,
    /// Last day of the date range the event pertains to.
    pub window_end: Option<NaiveDate>,
    /// Classification timestamp.
    pub observed_at: DateTime<Utc>,
    /// Free-form audit payload (baseline used, lookback, ...).
    pub meta: serde_json::Value,
}

/// A stored, immutable notification event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Event {
    /// Store-assigned identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: EventId,
    /// Route origin.
    pub origin: String,
    /// Route destination.
    pub dest: String,
    /// Event kind.
    pub event_type: EventType,
    /// Significance tier.
    pub severity: Severity,
    /// Signed percentage deviation from baseline.
    pub delta_pct: Option<f64>,
    /// Standardised deviation score.
    pub zscore: Option<f64>,
    /// Price observed at evaluation time.
    pub today_price: Option<f64>,
    /// First day of the date range the event pertains to.
    pub window_start: Option<NaiveDate>,
    /// Last day of the date range the event pertains to.
    pub window_end: Option<NaiveDate>,
    /// Classification timestamp.
    pub observed_at: DateTime<Utc>,
    /// Free-form audit payload.
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

impl Event {
    /// Materialises a [`NewEvent`] under the given identifier.
    #[must_use]
    pub fn from_new(id: EventId, new: NewEvent) -> Self {
        let NewEvent {
            route,
            event_type,
            severity,
            delta_pct,
            zscore,
            today_price,
            window_start,
            window_end,
            observed_at,
            meta,
        } = new;
        Self {
            id,
            origin: route.origin().to_string(),
            dest: route.dest().to_string(),
            event_type,
            severity,
            delta_pct,
            zscore,
            today_price,
            window_start,
            window_end,
            observed_at,
            meta,
        }
    }

    /// `ORIGIN-DEST` key, as used by WebSocket subscriptions.
    #[must_use]
    pub fn route_key(&self) -> String {
        format!("{}-{}", self.origin, self.dest)
    }
}
