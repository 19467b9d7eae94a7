//! Badge view DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Badge, BadgeSnapshot};

/// Response body for `GET /badges` and `POST /badges/refresh`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeListResponse {
    /// Instant the window was anchored to.
    pub refreshed_at: DateTime<Utc>,
    /// Inclusive lower bound of the window.
    pub window_start: DateTime<Utc>,
    /// One badge per route with in-window events.
    pub data: Vec<Badge>,
}

impl From<&BadgeSnapshot> for BadgeListResponse {
    fn from(snapshot: &BadgeSnapshot) -> Self {
        Self {
            refreshed_at: snapshot.refreshed_at,
            window_start: snapshot.window_start,
            data: snapshot.badges.clone(),
        }
    }
}
