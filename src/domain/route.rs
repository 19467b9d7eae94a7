//! Type-safe route key.
//!
//! A [`Route`] is the `(origin, dest)` pair every event and badge is keyed
//! by. Endpoints are normalised on construction so `"jfk"` and `" JFK "`
//! name the same route.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Origin/destination pair being monitored for price changes.
///
/// Ordering is lexicographic on `(origin, dest)`, which gives badge
/// snapshots a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Route {
    origin: String,
    dest: String,
}

impl Route {
    /// Creates a route from its two endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRoute`] if either endpoint is empty
    /// after trimming or contains the `-` separator.
    pub fn new(origin: &str, dest: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            origin: normalise_endpoint(origin)?,
            dest: normalise_endpoint(dest)?,
        })
    }

    /// Origin endpoint.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Destination endpoint.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Parses a comma-separated route list such as `"JFK-LHR, SFO-NRT"`.
    ///
    /// Empty items are ignored; duplicates are removed while keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRoute`] for the first malformed item.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ServiceError> {
        let mut routes: Vec<Self> = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let route: Self = item.parse()?;
            if !routes.contains(&route) {
                routes.push(route);
            }
        }
        Ok(routes)
    }
}

fn normalise_endpoint(raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidRoute(
            "route endpoint must not be empty".to_string(),
        ));
    }
    if trimmed.contains('-') {
        return Err(ServiceError::InvalidRoute(format!(
            "route endpoint {trimmed:?} must not contain '-'"
        )));
    }
    Ok(trimmed.to_uppercase())
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.dest)
    }
}

impl FromStr for Route {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((origin, dest)) = s.split_once('-') else {
            return Err(ServiceError::InvalidRoute(format!(
                "expected ORIGIN-DEST, got {s:?}"
            )));
        };
        Self::new(origin, dest)
    }
}
