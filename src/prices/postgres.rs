//! PostgreSQL price source over `price_observations` and
//! `booking_windows`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use super::{PriceSnapshot, PriceSource, PriceSourceError, start_of_day};
use crate::domain::{BookingWindow, Route};

/// Price source computing baselines in SQL with `percentile_cont(0.5)`.
#[derive(Debug, Clone)]
pub struct PostgresPriceSource {
    pool: PgPool,
}

impl PostgresPriceSource {
    /// Creates a source over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Connection-level failures mean the source is down; anything else is
/// blamed on the route being read.
fn classify_error(route: &Route, err: sqlx::Error) -> PriceSourceError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PriceSourceError::Unavailable(err.to_string()),
        other => PriceSourceError::Route {
            route: route.to_string(),
            reason: other.to_string(),
        },
    }
}

impl PriceSource for PostgresPriceSource {
    async fn check_available(&self) -> Result<(), PriceSourceError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| PriceSourceError::Unavailable(e.to_string()))
    }

    async fn snapshot(
        &self,
        route: &Route,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PriceSnapshot, PriceSourceError> {
        let today = start_of_day(now);
        let lookback_start = today - Duration::days(i64::from(lookback_days));

        let today_price = sqlx::query_scalar::<_, f64>(
            "SELECT price FROM price_observations \
             WHERE origin = $1 AND dest = $2 AND observed_at >= $3 AND observed_at <= $4 \
             ORDER BY observed_at DESC LIMIT 1",
        )
        .bind(route.origin())
        .bind(route.dest())
        .bind(today)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_error(route, e))?;

        let (baseline_price, baseline_stddev) = sqlx::query_as::<_, (Option<f64>, Option<f64>)>(
            "SELECT percentile_cont(0.5) WITHIN GROUP (ORDER BY price), stddev_samp(price) \
             FROM price_observations \
             WHERE origin = $1 AND dest = $2 AND observed_at >= $3 AND observed_at < $4",
        )
        .bind(route.origin())
        .bind(route.dest())
        .bind(lookback_start)
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_error(route, e))?;

        let booking_window = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
            "SELECT window_start, window_end FROM booking_windows \
             WHERE origin = $1 AND dest = $2 AND opens_at <= $3 \
               AND window_start <= $4 AND window_end >= $4 \
             ORDER BY opens_at DESC LIMIT 1",
        )
        .bind(route.origin())
        .bind(route.dest())
        .bind(now)
        .bind(now.date_naive())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_error(route, e))?
        .map(|(start, end)| BookingWindow { start, end });

        Ok(PriceSnapshot {
            today_price,
            baseline_price,
            baseline_stddev,
            booking_window,
        })
    }
}
