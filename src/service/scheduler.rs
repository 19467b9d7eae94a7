//! Scheduler trigger: periodically re-evaluates every tracked route and
//! appends the resulting events.
//!
//! One pass fetches a price snapshot per route, runs the
//! [`DeltaClassifier`], inserts whatever it produces and finally
//! refreshes the badge view. Failures are contained per route; only an
//! unreachable price source aborts the pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use super::BadgeService;
use crate::domain::{DeltaClassifier, EventBus, NewEvent, Notification, Observation, Route};
use crate::error::ServiceError;
use crate::persistence::{EventStore, StoreBackend};
use crate::prices::{PriceBackend, PriceSource, PriceSourceError};

/// Knobs for one scheduler instance.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Routes evaluated on every pass.
    pub routes: Vec<Route>,
    /// Baseline lookback in days.
    pub lookback_days: u32,
    /// Time between passes; also the dedupe period length.
    pub interval: std::time::Duration,
    /// Maximum routes evaluated concurrently.
    pub concurrency: usize,
    /// Skip routes that already have an event in the current period.
    pub dedupe_per_period: bool,
}

/// Overall result of a pass that reached the price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every route was evaluated and every event written.
    Clean,
    /// Some routes failed or some writes were dropped.
    PartialFailure,
}

/// A route whose evaluation was skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RouteFailure {
    /// `ORIGIN-DEST` key.
    pub route: String,
    /// Error description.
    pub reason: String,
}

/// Summary of one scheduler pass.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RunReport {
    /// Pass start.
    pub started_at: DateTime<Utc>,
    /// Pass end.
    pub finished_at: DateTime<Utc>,
    /// Routes whose price data was read.
    pub evaluated: usize,
    /// Events written.
    pub emitted: usize,
    /// Routes with no current price or no usable baseline.
    pub skipped_insufficient_data: usize,
    /// Routes skipped because the current period already has an event.
    pub skipped_duplicate: usize,
    /// Events that failed to write and were dropped.
    pub dropped_writes: usize,
    /// Per-route failures.
    pub failures: Vec<RouteFailure>,
    /// Clean or partial.
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Process exit status for a one-shot run: `0` clean, `2` partial.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Clean => 0,
            RunOutcome::PartialFailure => 2,
        }
    }
}

#[derive(Debug)]
enum RouteOutcome {
    Duplicate,
    Evaluated {
        emitted: usize,
        dropped: usize,
        classified: bool,
    },
    Failed(RouteFailure),
}

/// Start of the `interval`-aligned period containing `now`.
#[must_use]
pub fn period_start(now: DateTime<Utc>, interval: std::time::Duration) -> DateTime<Utc> {
    let len = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX).max(1);
    let secs = now.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(len), 0).unwrap_or(now)
}

/// Periodic route evaluator. The only writer to the event store.
#[derive(Debug)]
pub struct Scheduler {
    store: StoreBackend,
    prices: PriceBackend,
    classifier: DeltaClassifier,
    badges: Arc<BadgeService>,
    event_bus: EventBus,
    settings: SchedulerSettings,
}

impl Scheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(
        store: StoreBackend,
        prices: PriceBackend,
        classifier: DeltaClassifier,
        badges: Arc<BadgeService>,
        event_bus: EventBus,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            prices,
            classifier,
            badges,
            event_bus,
            settings,
        }
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Runs one pass anchored at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SourceUnavailable`] if the price source is
    /// down; events written before the outage was detected remain.
    pub async fn run_once(&self) -> Result<RunReport, ServiceError> {
        self.run_at(Utc::now()).await
    }

    /// Runs one pass anchored at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SourceUnavailable`] if the price source is
    /// down.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport, ServiceError> {
        let started_at = Utc::now();

        if let Err(e) = self.prices.check_available().await {
            tracing::error!(error = %e, "price source unreachable; aborting scheduler run");
            return Err(ServiceError::SourceUnavailable(e.to_string()));
        }

        let period = self
            .settings
            .dedupe_per_period
            .then(|| period_start(now, self.settings.interval));

        let mut report = RunReport {
            started_at,
            finished_at: started_at,
            evaluated: 0,
            emitted: 0,
            skipped_insufficient_data: 0,
            skipped_duplicate: 0,
            dropped_writes: 0,
            failures: Vec::new(),
            outcome: RunOutcome::Clean,
        };

        // Owned routes keep the stream `Send` for `tokio::spawn` and axum.
        let mut outcomes = stream::iter(self.settings.routes.clone())
            .map(|route| async move { self.evaluate_route(&route, now, period).await })
            .buffer_unordered(self.settings.concurrency.max(1));

        // Dropping the stream on a fatal error cancels routes still in
        // flight, so nothing further is written for this pass.
        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                RouteOutcome::Duplicate => report.skipped_duplicate += 1,
                RouteOutcome::Evaluated {
                    emitted,
                    dropped,
                    classified,
                } => {
                    report.evaluated += 1;
                    report.emitted += emitted;
                    report.dropped_writes += dropped;
                    if !classified {
                        report.skipped_insufficient_data += 1;
                    }
                }
                RouteOutcome::Failed(failure) => report.failures.push(failure),
            }
        }
        drop(outcomes);

        if !report.failures.is_empty() || report.dropped_writes > 0 {
            report.outcome = RunOutcome::PartialFailure;
        }
        report.failures.sort_by(|a, b| a.route.cmp(&b.route));

        if report.emitted > 0 {
            // Logged inside; badge readers keep the previous snapshot.
            let _ = self.badges.refresh_at(now).await;
        }

        report.finished_at = Utc::now();
        let _ = self.event_bus.publish(Notification::SchedulerRunCompleted {
            evaluated: report.evaluated,
            emitted: report.emitted,
            failed_routes: report.failures.len(),
            finished_at: report.finished_at,
        });

        tracing::info!(
            evaluated = report.evaluated,
            emitted = report.emitted,
            skipped_insufficient_data = report.skipped_insufficient_data,
            skipped_duplicate = report.skipped_duplicate,
            dropped_writes = report.dropped_writes,
            failed_routes = report.failures.len(),
            "scheduler run finished"
        );

        Ok(report)
    }

    async fn evaluate_route(
        &self,
        route: &Route,
        now: DateTime<Utc>,
        period: Option<DateTime<Utc>>,
    ) -> Result<RouteOutcome, ServiceError> {
        if let Some(period_start) = period {
            match self.store.has_event_since(route, period_start).await {
                Ok(true) => {
                    tracing::debug!(%route, %period_start, "event already recorded this period");
                    return Ok(RouteOutcome::Duplicate);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%route, error = %e, "dedupe check failed; skipping route");
                    return Ok(RouteOutcome::Failed(RouteFailure {
                        route: route.to_string(),
                        reason: e.to_string(),
                    }));
                }
            }
        }

        let snapshot = match self
            .prices
            .snapshot(route, self.settings.lookback_days, now)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(PriceSourceError::Unavailable(reason)) => {
                tracing::error!(%route, %reason, "price source went away mid-run");
                return Err(ServiceError::SourceUnavailable(reason));
            }
            Err(e) => {
                tracing::warn!(%route, error = %e, "price fetch failed; skipping route");
                return Ok(RouteOutcome::Failed(RouteFailure {
                    route: route.to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        let mut produced: Vec<NewEvent> = Vec::with_capacity(2);
        if let Some(today_price) = snapshot.today_price {
            let observation = Observation {
                route: route.clone(),
                today_price,
                baseline_price: snapshot.baseline_price,
                baseline_stddev: snapshot.baseline_stddev,
                lookback_days: self.settings.lookback_days,
                observed_at: now,
            };
            produced.extend(self.classifier.classify(&observation));
        }
        let classified = !produced.is_empty();
        if !classified {
            tracing::debug!(
                %route,
                today_price = ?snapshot.today_price,
                baseline_price = ?snapshot.baseline_price,
                "insufficient price data; nothing to classify"
            );
        }
        if let Some(window) = snapshot.booking_window {
            produced.push(
                self.classifier
                    .window_event(route, window, snapshot.today_price, now),
            );
        }

        let mut emitted = 0;
        let mut dropped = 0;
        for new_event in produced {
            let payload = serde_json::to_string(&new_event).unwrap_or_default();
            match self.store.insert(new_event).await {
                Ok(event) => {
                    emitted += 1;
                    tracing::info!(
                        %route,
                        event_id = %event.id,
                        event_type = %event.event_type,
                        severity = %event.severity,
                        delta_pct = ?event.delta_pct,
                        "event recorded"
                    );
                    let _ = self.event_bus.publish(Notification::EventRecorded { event });
                }
                Err(e) => {
                    dropped += 1;
                    tracing::error!(%route, error = %e, %payload, "event write failed; dropping");
                }
            }
        }

        Ok(RouteOutcome::Evaluated {
            emitted,
            dropped,
            classified,
        })
    }

    /// Spawns the periodic trigger. The first pass runs immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "scheduler run aborted");
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{BookingWindow, Event, EventType, Severity};
    use crate::persistence::MemoryEventStore;
    use crate::prices::{MemoryPriceSource, start_of_day};
    use chrono::{Duration, NaiveDate};

    struct Harness {
        store: MemoryEventStore,
        prices: MemoryPriceSource,
        badges: Arc<BadgeService>,
        scheduler: Scheduler,
    }

    fn route(key: &str) -> Route {
        let Ok(route) = key.parse() else {
            panic!("valid route");
        };
        route
    }

    fn harness(routes: &[&str], dedupe: bool) -> Harness {
        harness_with(routes, dedupe, 2)
    }

    fn harness_with(routes: &[&str], dedupe: bool, concurrency: usize) -> Harness {
        let store = MemoryEventStore::new();
        let prices = MemoryPriceSource::new();
        let bus = EventBus::new(64);
        let badges = Arc::new(BadgeService::new(
            StoreBackend::Memory(store.clone()),
            bus.clone(),
            Duration::hours(24),
        ));
        let scheduler = Scheduler::new(
            StoreBackend::Memory(store.clone()),
            PriceBackend::Memory(prices.clone()),
            DeltaClassifier::default(),
            Arc::clone(&badges),
            bus,
            SchedulerSettings {
                routes: routes.iter().map(|r| route(r)).collect(),
                lookback_days: 30,
                interval: std::time::Duration::from_secs(6 * 60 * 60),
                concurrency,
                dedupe_per_period: dedupe,
            },
        );
        Harness {
            store,
            prices,
            badges,
            scheduler,
        }
    }

    fn noon() -> DateTime<Utc> {
        start_of_day(Utc::now()) + Duration::hours(12)
    }

    async fn seed(prices: &MemoryPriceSource, key: &str, baseline: f64, today: f64, now: DateTime<Utc>) {
        let route = route(key);
        for days_ago in 1..=5 {
            prices
                .record_price(&route, now - Duration::days(days_ago), baseline)
                .await;
        }
        prices
            .record_price(&route, now - Duration::hours(1), today)
            .await;
    }

    #[tokio::test]
    async fn drop_is_classified_stored_and_badged() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 78.0, now).await;

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.emitted, 1);
        assert_eq!(report.outcome, RunOutcome::Clean);
        assert_eq!(report.exit_code(), 0);

        let Ok(events) = h.store.events_since(now - Duration::hours(1)).await else {
            panic!("read failed");
        };
        let Some(event) = events.first() else {
            panic!("expected stored event");
        };
        assert_eq!(event.event_type, EventType::PriceDrop);
        assert_eq!(event.severity, Severity::Urgent);
        assert_eq!(event.delta_pct, Some(-22.0));

        let Ok(badge) = h.badges.badge(&route("JFK-LHR")).await else {
            panic!("badge should be refreshed after emitting");
        };
        assert_eq!(badge.top_severity, Some(Severity::Urgent));
    }

    #[tokio::test]
    async fn missing_history_is_a_skip_not_a_failure() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        h.prices
            .record_price(&route("JFK-LHR"), now - Duration::hours(1), 90.0)
            .await;

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.emitted, 0);
        assert_eq!(report.skipped_insufficient_data, 1);
        assert_eq!(report.outcome, RunOutcome::Clean);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn one_failing_route_does_not_abort_the_rest() {
        let h = harness(&["JFK-LHR", "SFO-NRT", "AMS-BCN"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;
        seed(&h.prices, "AMS-BCN", 100.0, 103.0, now).await;
        h.prices
            .set_route_failure(&route("SFO-NRT"), Some("upstream 502"))
            .await;

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.emitted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures.first().map(|f| f.route.as_str()),
            Some("SFO-NRT")
        );
        assert_eq!(report.outcome, RunOutcome::PartialFailure);
        assert_eq!(report.exit_code(), 2);
    }

    #[tokio::test]
    async fn unavailable_source_is_fatal() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;
        h.prices.set_unavailable(true);

        assert!(matches!(
            h.scheduler.run_at(now).await,
            Err(ServiceError::SourceUnavailable(_))
        ));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn rerun_appends_duplicates_without_dedupe() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;

        let _ = h.scheduler.run_at(now).await;
        let _ = h.scheduler.run_at(now).await;
        assert_eq!(h.store.len().await, 2);
    }

    #[tokio::test]
    async fn dedupe_skips_second_run_in_same_period() {
        let h = harness(&["JFK-LHR"], true);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;

        let _ = h.scheduler.run_at(now).await;
        let Ok(second) = h.scheduler.run_at(now + Duration::minutes(5)).await else {
            panic!("run failed");
        };
        assert_eq!(second.skipped_duplicate, 1);
        assert_eq!(second.emitted, 0);
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn dropped_write_is_counted() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;
        h.store.set_write_failure(true);

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.dropped_writes, 1);
        assert_eq!(report.emitted, 0);
        assert_eq!(report.outcome, RunOutcome::PartialFailure);
    }

    #[tokio::test]
    async fn open_booking_window_emits_window_event() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 103.0, now).await;
        let today = now.date_naive();
        h.prices
            .set_booking_window(
                &route("JFK-LHR"),
                Some(BookingWindow {
                    start: today - Duration::days(2),
                    end: today + Duration::days(14),
                }),
            )
            .await;

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.emitted, 2);

        let Ok(badge) = h.badges.badge(&route("JFK-LHR")).await else {
            panic!("expected badge");
        };
        assert!(badge.window_open);
        assert_eq!(badge.top_severity, None);
    }

    #[tokio::test]
    async fn expired_booking_window_emits_nothing() {
        let h = harness(&["JFK-LHR"], false);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 103.0, now).await;
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2020, 1, 1),
            NaiveDate::from_ymd_opt(2020, 1, 10),
        ) else {
            panic!("valid dates");
        };
        h.prices
            .set_booking_window(&route("JFK-LHR"), Some(BookingWindow { start, end }))
            .await;

        let Ok(report) = h.scheduler.run_at(now).await else {
            panic!("run failed");
        };
        assert_eq!(report.emitted, 1);

        let Ok(events) = h.store.events_since(now - Duration::hours(1)).await else {
            panic!("read failed");
        };
        assert!(events.iter().all(|e| e.event_type != EventType::WindowOpen));

        let Ok(badge) = h.badges.badge(&route("JFK-LHR")).await else {
            panic!("expected badge");
        };
        assert!(!badge.window_open);
    }

    #[tokio::test]
    async fn outage_mid_run_aborts_and_keeps_earlier_writes() {
        let h = harness_with(&["JFK-LHR", "SFO-NRT", "AMS-BCN"], false, 1);
        let now = noon();
        seed(&h.prices, "JFK-LHR", 100.0, 85.0, now).await;
        seed(&h.prices, "SFO-NRT", 100.0, 85.0, now).await;
        seed(&h.prices, "AMS-BCN", 100.0, 85.0, now).await;
        h.prices.set_route_outage(&route("SFO-NRT"), true).await;

        assert!(matches!(
            h.scheduler.run_at(now).await,
            Err(ServiceError::SourceUnavailable(_))
        ));

        let Ok(events) = h.store.events_since(now - Duration::hours(1)).await else {
            panic!("read failed");
        };
        let routes: Vec<String> = events.iter().map(Event::route_key).collect();
        assert_eq!(routes, vec!["JFK-LHR".to_string()]);
    }

    #[tokio::test]
    async fn spawned_trigger_runs_first_pass_immediately() {
        let Harness {
            store,
            prices,
            scheduler,
            ..
        } = harness(&["JFK-LHR"], false);
        let now = Utc::now();
        for days_ago in 1..=5 {
            prices
                .record_price(&route("JFK-LHR"), now - Duration::days(days_ago), 100.0)
                .await;
        }
        prices.record_price(&route("JFK-LHR"), now, 70.0).await;

        let handle = Arc::new(scheduler).spawn();
        let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while store.is_empty().await {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        handle.abort();

        assert!(waited.is_ok(), "first pass never wrote an event");
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn period_start_aligns_to_interval() {
        let six_hours = std::time::Duration::from_secs(6 * 60 * 60);
        let day = start_of_day(Utc::now());
        assert_eq!(period_start(day + Duration::hours(7), six_hours), day + Duration::hours(6));
        assert_eq!(period_start(day + Duration::hours(6), six_hours), day + Duration::hours(6));
    }
}
