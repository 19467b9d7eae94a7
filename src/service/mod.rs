//! Service layer: badge refresh and the scheduler trigger.
//!
//! [`BadgeService`] owns the served badge snapshot; [`Scheduler`] is the
//! sole writer to the event store and emits notifications through the
//! [`super::domain::EventBus`].

pub mod badge_service;
pub mod scheduler;

pub use badge_service::BadgeService;
pub use scheduler::{RouteFailure, RunOutcome, RunReport, Scheduler, SchedulerSettings};
