//! Domain layer: routes, events, classification and badge aggregation.
//!
//! Everything in this module is free of I/O. The classifier and the
//! aggregator are pure functions; the event bus is the only shared state.

pub mod badge;
pub mod baseline;
pub mod classifier;
pub mod event;
pub mod event_bus;
pub mod event_id;
pub mod notification;
pub mod route;

pub use badge::{Badge, BadgeSnapshot};
pub use classifier::{BookingWindow, ClassifierThresholds, DeltaClassifier, Observation};
pub use event::{Event, EventType, NewEvent, Severity};
pub use event_bus::EventBus;
pub use event_id::EventId;
pub use notification::Notification;
pub use route::Route;
