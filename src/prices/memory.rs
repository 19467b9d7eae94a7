//! In-process price source.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{PriceSnapshot, PriceSource, PriceSourceError, start_of_day};
use crate::domain::baseline::{median, sample_stddev};
use crate::domain::{BookingWindow, Route};

#[derive(Debug, Default)]
struct RouteSeries {
    observations: Vec<(DateTime<Utc>, f64)>,
    booking_window: Option<BookingWindow>,
    failure: Option<String>,
    outage: bool,
}

/// Price source holding per-route observation series in memory.
///
/// Baselines are computed with the same rules the PostgreSQL source uses:
/// median and sample standard deviation over
/// `[today - lookback_days, today)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceSource {
    series: Arc<RwLock<HashMap<Route, RouteSeries>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryPriceSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one price observation.
    pub async fn record_price(&self, route: &Route, observed_at: DateTime<Utc>, price: f64) {
        self.series
            .write()
            .await
            .entry(route.clone())
            .or_default()
            .observations
            .push((observed_at, price));
    }

    /// Publishes (or clears) the open booking window for a route.
    pub async fn set_booking_window(&self, route: &Route, window: Option<BookingWindow>) {
        self.series
            .write()
            .await
            .entry(route.clone())
            .or_default()
            .booking_window = window;
    }

    /// Makes reads for one route fail with `reason` (or succeed again with
    /// `None`).
    pub async fn set_route_failure(&self, route: &Route, reason: Option<&str>) {
        self.series
            .write()
            .await
            .entry(route.clone())
            .or_default()
            .failure = reason.map(str::to_string);
    }

    /// Makes reads for one route report the whole source as unavailable,
    /// while the availability check keeps passing. Models a source that
    /// goes down partway through a run.
    pub async fn set_route_outage(&self, route: &Route, outage: bool) {
        self.series
            .write()
            .await
            .entry(route.clone())
            .or_default()
            .outage = outage;
    }

    /// Marks the whole source as down or up.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), PriceSourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PriceSourceError::Unavailable(
                "in-memory source marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl PriceSource for MemoryPriceSource {
    async fn check_available(&self) -> Result<(), PriceSourceError> {
        self.ensure_available()
    }

    async fn snapshot(
        &self,
        route: &Route,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PriceSnapshot, PriceSourceError> {
        self.ensure_available()?;

        let series = self.series.read().await;
        let Some(entry) = series.get(route) else {
            return Ok(PriceSnapshot::default());
        };
        if entry.outage {
            return Err(PriceSourceError::Unavailable(format!(
                "connection lost while reading {route}"
            )));
        }
        if let Some(reason) = &entry.failure {
            return Err(PriceSourceError::Route {
                route: route.to_string(),
                reason: reason.clone(),
            });
        }

        let today = start_of_day(now);
        let lookback_start = today - Duration::days(i64::from(lookback_days));

        let today_price = entry
            .observations
            .iter()
            .filter(|(at, _)| *at >= today && *at <= now)
            .max_by_key(|(at, _)| *at)
            .map(|(_, price)| *price);

        let history: Vec<f64> = entry
            .observations
            .iter()
            .filter(|(at, _)| *at >= lookback_start && *at < today)
            .map(|(_, price)| *price)
            .collect();

        Ok(PriceSnapshot {
            today_price,
            baseline_price: median(&history),
            baseline_stddev: sample_stddev(&history),
            booking_window: entry
                .booking_window
                .filter(|window| window.is_open_on(now.date_naive())),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn route() -> Route {
        let Ok(route) = Route::new("JFK", "LHR") else {
            panic!("valid route");
        };
        route
    }

    #[tokio::test]
    async fn unknown_route_has_empty_snapshot() {
        let source = MemoryPriceSource::new();
        let Ok(snapshot) = source.snapshot(&route(), 30, Utc::now()).await else {
            panic!("snapshot failed");
        };
        assert_eq!(snapshot, PriceSnapshot::default());
    }

    #[tokio::test]
    async fn baseline_excludes_today_and_old_history() {
        let source = MemoryPriceSource::new();
        let route = route();
        let now = start_of_day(Utc::now()) + Duration::hours(12);

        for (days_ago, price) in [(1, 100.0), (2, 120.0), (3, 80.0)] {
            source
                .record_price(&route, now - Duration::days(days_ago), price)
                .await;
        }
        source
            .record_price(&route, now - Duration::days(90), 10.0)
            .await;
        source
            .record_price(&route, now - Duration::hours(2), 85.0)
            .await;
        source
            .record_price(&route, now - Duration::hours(1), 84.0)
            .await;

        let Ok(snapshot) = source.snapshot(&route, 30, now).await else {
            panic!("snapshot failed");
        };
        assert_eq!(snapshot.today_price, Some(84.0));
        assert_eq!(snapshot.baseline_price, Some(100.0));
        assert_eq!(snapshot.baseline_stddev, Some(20.0));
    }

    #[tokio::test]
    async fn only_current_booking_window_is_reported() {
        let source = MemoryPriceSource::new();
        let route = route();
        let now = start_of_day(Utc::now()) + Duration::hours(12);
        let today = now.date_naive();

        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2020, 1, 1),
            NaiveDate::from_ymd_opt(2020, 1, 10),
        ) else {
            panic!("valid dates");
        };
        source
            .set_booking_window(&route, Some(BookingWindow { start, end }))
            .await;
        let Ok(expired) = source.snapshot(&route, 30, now).await else {
            panic!("snapshot failed");
        };
        assert_eq!(expired.booking_window, None);

        let future = BookingWindow {
            start: today + Duration::days(3),
            end: today + Duration::days(10),
        };
        source.set_booking_window(&route, Some(future)).await;
        let Ok(upcoming) = source.snapshot(&route, 30, now).await else {
            panic!("snapshot failed");
        };
        assert_eq!(upcoming.booking_window, None);

        let current = BookingWindow {
            start: today,
            end: today + Duration::days(10),
        };
        source.set_booking_window(&route, Some(current)).await;
        let Ok(open) = source.snapshot(&route, 30, now).await else {
            panic!("snapshot failed");
        };
        assert_eq!(open.booking_window, Some(current));
    }

    #[tokio::test]
    async fn route_outage_passes_probe_but_fails_reads() {
        let source = MemoryPriceSource::new();
        let route = route();
        source.set_route_outage(&route, true).await;

        assert!(source.check_available().await.is_ok());
        assert!(matches!(
            source.snapshot(&route, 30, Utc::now()).await,
            Err(PriceSourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn route_failure_and_outage_are_distinct() {
        let source = MemoryPriceSource::new();
        let route = route();

        source.set_route_failure(&route, Some("timeout")).await;
        assert!(matches!(
            source.snapshot(&route, 30, Utc::now()).await,
            Err(PriceSourceError::Route { .. })
        ));

        source.set_unavailable(true);
        assert!(matches!(
            source.check_available().await,
            Err(PriceSourceError::Unavailable(_))
        ));
    }
}
