//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire, matching the dashboard client.

pub mod common_dto;
pub mod record_dto;
pub mod realtime_dto;

pub use common_dto::*;
pub use realtime_dto::*;
pub use record_dto::*;
