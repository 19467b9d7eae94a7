//! Event log DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Event, Route};
use crate::error::ServiceError;
use crate::persistence::EventQuery;

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQueryParams {
    /// Route origin; must be given together with `dest`.
    #[serde(default)]
    pub origin: Option<String>,
    /// Route destination; must be given together with `origin`.
    #[serde(default)]
    pub dest: Option<String>,
    /// Only events observed at or after this RFC 3339 instant.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Maximum rows (1–500). Defaults to 100.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl EventQueryParams {
    /// Validates the parameters into a store query.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if only one of `origin`
    /// and `dest` is given, or [`ServiceError::InvalidRoute`] if they do
    /// not form a valid route.
    pub fn to_query(&self) -> Result<EventQuery, ServiceError> {
        let route = match (&self.origin, &self.dest) {
            (Some(origin), Some(dest)) => Some(Route::new(origin, dest)?),
            (None, None) => None,
            _ => {
                return Err(ServiceError::InvalidRequest(
                    "origin and dest must be given together".to_string(),
                ));
            }
        };
        Ok(EventQuery {
            route,
            since: self.since,
            limit: self.limit,
        })
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events, newest first.
    pub data: Vec<Event>,
    /// Number of events returned.
    pub count: usize,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn params(origin: Option<&str>, dest: Option<&str>, limit: usize) -> EventQueryParams {
        EventQueryParams {
            origin: origin.map(str::to_string),
            dest: dest.map(str::to_string),
            since: None,
            limit,
        }
    }

    #[test]
    fn half_a_route_is_rejected() {
        assert!(matches!(
            params(Some("JFK"), None, 10).to_query(),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn limit_is_clamped_by_store_query() {
        let Ok(query) = params(Some("jfk"), Some("lhr"), 10_000).to_query() else {
            panic!("valid params");
        };
        assert_eq!(query.clamped_limit(), crate::persistence::MAX_QUERY_LIMIT);
        assert_eq!(query.route.map(|r| r.to_string()).as_deref(), Some("JFK-LHR"));
        let Ok(query) = params(None, None, 0).to_query() else {
            panic!("valid params");
        };
        assert_eq!(query.clamped_limit(), 1);
    }
}
