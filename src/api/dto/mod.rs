//! Data Transfer Objects for REST request/response serialization.

pub mod badge_dto;
pub mod common_dto;
pub mod event_dto;

pub use badge_dto::*;
pub use common_dto::*;
pub use event_dto::*;
