//! Delta classifier: turns a price observation into at most one event.
//!
//! Classification is a pure function of its inputs. Inserting the result
//! is the scheduler's job, so everything here is testable without a store.
//!
//! Rules, first match wins:
//!
//! | `delta_pct`        | event type       | severity                 |
//! |--------------------|------------------|--------------------------|
//! | `<= -urgent`       | `price_drop`     | `urgent`                 |
//! | `<= -alert`        | `price_drop`     | `alert`                  |
//! | `>= urgent`        | `price_spike`    | `urgent`                 |
//! | `>= alert`         | `price_spike`    | `alert`                  |
//! | otherwise          | `trend_reversal` | `info`                   |
//!
//! With the default bands `alert = 10` and `urgent = 20`. Both bounds are
//! inclusive.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::event::{EventType, NewEvent, Severity};
use super::Route;
use crate::error::ServiceError;

/// Default magnitude (in percent) at which a move becomes an alert.
pub const DEFAULT_ALERT_PCT: f64 = 10.0;

/// Default magnitude (in percent) at which a move becomes urgent.
pub const DEFAULT_URGENT_PCT: f64 = 20.0;

/// Percentage bands used for classification. Both are positive magnitudes
/// applied symmetrically to drops and spikes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassifierThresholds {
    alert_pct: f64,
    urgent_pct: f64,
}

impl ClassifierThresholds {
    /// Creates a validated threshold pair.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidConfig`] unless
    /// `0 < alert_pct < urgent_pct` and both are finite.
    pub fn new(alert_pct: f64, urgent_pct: f64) -> Result<Self, ServiceError> {
        if !alert_pct.is_finite() || !urgent_pct.is_finite() {
            return Err(ServiceError::InvalidConfig(
                "classifier thresholds must be finite".to_string(),
            ));
        }
        if alert_pct <= 0.0 || urgent_pct <= alert_pct {
            return Err(ServiceError::InvalidConfig(format!(
                "classifier thresholds must satisfy 0 < alert ({alert_pct}) < urgent ({urgent_pct})"
            )));
        }
        Ok(Self {
            alert_pct,
            urgent_pct,
        })
    }

    /// Alert band magnitude.
    #[must_use]
    pub const fn alert_pct(&self) -> f64 {
        self.alert_pct
    }

    /// Urgent band magnitude.
    #[must_use]
    pub const fn urgent_pct(&self) -> f64 {
        self.urgent_pct
    }
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            alert_pct: DEFAULT_ALERT_PCT,
            urgent_pct: DEFAULT_URGENT_PCT,
        }
    }
}

/// Inclusive date range during which a route is bookable at a notable
/// fare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    /// First bookable travel date.
    pub start: NaiveDate,
    /// Last bookable travel date.
    pub end: NaiveDate,
}

impl BookingWindow {
    /// Whether `date` falls inside `[start, end]`.
    #[must_use]
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Everything the classifier needs to evaluate one route once.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Route being evaluated.
    pub route: Route,
    /// Price observed now.
    pub today_price: f64,
    /// Trailing median, `None` when history is insufficient.
    pub baseline_price: Option<f64>,
    /// Sample standard deviation over the same lookback.
    pub baseline_stddev: Option<f64>,
    /// Lookback length the baseline was computed over.
    pub lookback_days: u32,
    /// Evaluation timestamp stamped onto the event.
    pub observed_at: DateTime<Utc>,
}

/// Signed percentage deviation of `today` from `baseline`.
///
/// `None` when the baseline is zero or either value is not finite.
#[must_use]
pub fn delta_pct(today: f64, baseline: f64) -> Option<f64> {
    if !today.is_finite() || !baseline.is_finite() || baseline == 0.0 {
        return None;
    }
    Some(100.0 * (today - baseline) / baseline)
}

/// Pure classifier over a fixed pair of bands.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaClassifier {
    thresholds: ClassifierThresholds,
}

impl DeltaClassifier {
    /// Creates a classifier using the given bands.
    #[must_use]
    pub const fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    /// Active bands.
    #[must_use]
    pub const fn thresholds(&self) -> ClassifierThresholds {
        self.thresholds
    }

    /// Maps a percentage deviation to an event type and severity.
    #[must_use]
    pub fn classify_delta(&self, delta_pct: f64) -> (EventType, Severity) {
        let alert = self.thresholds.alert_pct;
        let urgent = self.thresholds.urgent_pct;

        if delta_pct <= -alert {
            let severity = if delta_pct <= -urgent {
                Severity::Urgent
            } else {
                Severity::Alert
            };
            (EventType::PriceDrop, severity)
        } else if delta_pct >= alert {
            let severity = if delta_pct >= urgent {
                Severity::Urgent
            } else {
                Severity::Alert
            };
            (EventType::PriceSpike, severity)
        } else {
            (EventType::TrendReversal, Severity::Info)
        }
    }

    /// Classifies one observation.
    ///
    /// Returns `None` when the baseline is missing or zero: there is not
    /// enough history to say anything, which is a skip rather than an
    /// error.
    #[must_use]
    pub fn classify(&self, obs: &Observation) -> Option<NewEvent> {
        let baseline = obs.baseline_price?;
        let delta = delta_pct(obs.today_price, baseline)?;
        let (event_type, severity) = self.classify_delta(delta);

        let zscore = obs
            .baseline_stddev
            .filter(|sd| sd.is_finite() && *sd > 0.0)
            .map(|sd| (obs.today_price - baseline) / sd);

        let mut meta = serde_json::json!({
            "baseline": baseline,
            "lookback_days": obs.lookback_days,
        });
        if let (Some(sd), Some(map)) = (obs.baseline_stddev, meta.as_object_mut()) {
            map.insert("baseline_stddev".to_string(), serde_json::json!(sd));
        }

        Some(NewEvent {
            route: obs.route.clone(),
            event_type,
            severity,
            delta_pct: Some(delta),
            zscore,
            today_price: Some(obs.today_price),
            window_start: None,
            window_end: None,
            observed_at: obs.observed_at,
            meta,
        })
    }

    /// Builds the `window_open` event for an open booking window.
    #[must_use]
    pub fn window_event(
        &self,
        route: &Route,
        window: BookingWindow,
        today_price: Option<f64>,
        observed_at: DateTime<Utc>,
    ) -> NewEvent {
        NewEvent {
            route: route.clone(),
            event_type: EventType::WindowOpen,
            severity: Severity::Info,
            delta_pct: None,
            zscore: None,
            today_price: today_price.filter(|p| p.is_finite()),
            window_start: Some(window.start),
            window_end: Some(window.end),
            observed_at,
            meta: serde_json::json!({
                "window_days": (window.end - window.start).num_days() + 1,
            }),
        }
    }
}
