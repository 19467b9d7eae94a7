//! Database row models for the `notification_events` table.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Event, EventId};
use crate::error::ServiceError;

/// Column list shared by every `SELECT` against `notification_events`.
pub const EVENT_COLUMNS: &str = "id, origin, dest, event_type, severity, delta_pct, zscore, \
     today_price, window_start, window_end, observed_at, meta";

/// A stored row from `notification_events`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Route origin.
    pub origin: String,
    /// Route destination.
    pub dest: String,
    /// Event type discriminator (e.g. `"price_drop"`).
    pub event_type: String,
    /// Severity discriminator (e.g. `"alert"`).
    pub severity: String,
    /// Signed percentage deviation.
    pub delta_pct: Option<f64>,
    /// Standardised deviation score.
    pub zscore: Option<f64>,
    /// Observed price.
    pub today_price: Option<f64>,
    /// Window start date.
    pub window_start: Option<NaiveDate>,
    /// Window end date.
    pub window_end: Option<NaiveDate>,
    /// Classification timestamp.
    pub observed_at: DateTime<Utc>,
    /// JSONB audit payload.
    pub meta: serde_json::Value,
}

impl TryFrom<EventRow> for Event {
    type Error = ServiceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = row
            .event_type
            .parse()
            .map_err(|_| ServiceError::PersistenceError(format!(
                "row {} has unknown event_type {:?}",
                row.id, row.event_type
            )))?;
        let severity = row
            .severity
            .parse()
            .map_err(|_| ServiceError::PersistenceError(format!(
                "row {} has unknown severity {:?}",
                row.id, row.severity
            )))?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            origin: row.origin,
            dest: row.dest,
            event_type,
            severity,
            delta_pct: row.delta_pct,
            zscore: row.zscore,
            today_price: row.today_price,
            window_start: row.window_start,
            window_end: row.window_end,
            observed_at: row.observed_at,
            meta: row.meta,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventType, Severity};

    fn row(event_type: &str, severity: &str) -> EventRow {
        EventRow {
            id: Uuid::new_v4(),
            origin: "JFK".to_string(),
            dest: "LHR".to_string(),
            event_type: event_type.to_string(),
            severity: severity.to_string(),
            delta_pct: Some(-15.0),
            zscore: None,
            today_price: Some(85.0),
            window_start: None,
            window_end: None,
            observed_at: Utc::now(),
            meta: serde_json::json!({ "baseline": 100.0 }),
        }
    }

    #[test]
    fn valid_row_converts() {
        let Ok(event) = Event::try_from(row("price_drop", "alert")) else {
            panic!("conversion failed");
        };
        assert_eq!(event.event_type, EventType::PriceDrop);
        assert_eq!(event.severity, Severity::Alert);
    }

    #[test]
    fn unknown_discriminators_rejected() {
        assert!(Event::try_from(row("price_crash", "alert")).is_err());
        assert!(Event::try_from(row("price_drop", "critical")).is_err());
    }
}
