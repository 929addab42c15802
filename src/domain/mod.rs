//! Domain layer for rask-measurement-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `Event`: a named analytics event with its parameter map
//! - `UserPropertyValue`: the value half of a user property
//! - `Identity` / `SessionContext`: request-wide identifiers
//! - `Timestamp`: validated microsecond instant
//! - `ValidationError`: fail-fast local validation errors

pub mod error;
pub mod event;
pub mod identity;
pub mod timestamp;
pub mod user_property;

pub use error::ValidationError;
pub use event::Event;
pub use identity::{Identity, SessionContext};
pub use timestamp::{MAX_TIMESTAMP_AGE_MICROS, Timestamp};
pub use user_property::{MAX_USER_PROPERTIES, UserPropertyValue};
