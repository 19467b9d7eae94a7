//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::Route;
use crate::error::ServiceError;

/// Path parameters addressing a single route.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct RoutePath {
    /// Route origin (case-insensitive).
    pub origin: String,
    /// Route destination (case-insensitive).
    pub dest: String,
}

impl RoutePath {
    /// Normalises the path segments into a [`Route`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRoute`] for empty or malformed
    /// segments.
    pub fn route(&self) -> Result<Route, ServiceError> {
        Route::new(&self.origin, &self.dest)
    }
}
