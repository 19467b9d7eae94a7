//! # route-pulse
//!
//! Price-delta notifications for tracked flight routes.
//!
//! Every scheduler period each tracked route is re-evaluated: today's fare
//! is compared with its trailing median baseline, the delta is classified
//! into a severity band, and qualifying moves are appended to the
//! notification event store. A badge view aggregates the trailing 24 hours
//! of events into one summary per route.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── Scheduler, BadgeService (service/)
//!     ├── DeltaClassifier, EventBus (domain/)
//!     │
//!     ├── PriceSource (prices/)
//!     └── EventStore (persistence/) ── PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod prices;
pub mod service;
pub mod ws;
