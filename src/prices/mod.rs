//! Price data source consulted by the scheduler.
//!
//! A [`PriceSource`] answers one question per route: what is the price
//! now, what is the trailing baseline, and is a booking window open?
//! Errors distinguish a single route's data being unavailable (skip the
//! route) from the whole source being down (abort the run).

pub mod memory;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::domain::{BookingWindow, Route};

pub use memory::MemoryPriceSource;
pub use postgres::PostgresPriceSource;

/// Price facts for one route at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceSnapshot {
    /// Latest price observed today, if any.
    pub today_price: Option<f64>,
    /// Median over the lookback, excluding today.
    pub baseline_price: Option<f64>,
    /// Sample standard deviation over the same lookback.
    pub baseline_stddev: Option<f64>,
    /// Currently open booking window, if one has been published.
    pub booking_window: Option<BookingWindow>,
}

/// Failure reading price data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceSourceError {
    /// The source as a whole cannot be reached.
    #[error("price source unavailable: {0}")]
    Unavailable(String),

    /// Data for one route could not be read.
    #[error("price data for {route} unavailable: {reason}")]
    Route {
        /// Route being evaluated.
        route: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Read access to route price data.
pub trait PriceSource: Send + Sync {
    /// Cheap probe run before each scheduler pass.
    ///
    /// # Errors
    ///
    /// Returns [`PriceSourceError::Unavailable`] if the source cannot be
    /// reached.
    fn check_available(&self) -> impl Future<Output = Result<(), PriceSourceError>> + Send;

    /// Reads the price snapshot for `route` as of `now`, with the baseline
    /// computed over the `lookback_days` preceding today.
    ///
    /// # Errors
    ///
    /// Returns [`PriceSourceError::Route`] for route-local failures and
    /// [`PriceSourceError::Unavailable`] when the source goes down.
    fn snapshot(
        &self,
        route: &Route,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<PriceSnapshot, PriceSourceError>> + Send;
}

/// Price source selected at startup.
#[derive(Debug, Clone)]
pub enum PriceBackend {
    /// Process-local price series.
    Memory(MemoryPriceSource),
    /// PostgreSQL `price_observations` / `booking_windows` tables.
    Postgres(PostgresPriceSource),
}

impl PriceSource for PriceBackend {
    async fn check_available(&self) -> Result<(), PriceSourceError> {
        match self {
            Self::Memory(source) => source.check_available().await,
            Self::Postgres(source) => source.check_available().await,
        }
    }

    async fn snapshot(
        &self,
        route: &Route,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PriceSnapshot, PriceSourceError> {
        match self {
            Self::Memory(source) => source.snapshot(route, lookback_days, now).await,
            Self::Postgres(source) => source.snapshot(route, lookback_days, now).await,
        }
    }
}

impl From<MemoryPriceSource> for PriceBackend {
    fn from(source: MemoryPriceSource) -> Self {
        Self::Memory(source)
    }
}

impl From<PostgresPriceSource> for PriceBackend {
    fn from(source: PostgresPriceSource) -> Self {
        Self::Postgres(source)
    }
}

/// Midnight UTC of the day containing `now`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}
