//! Common utility functions shared by the domain and the engine adapters.
//!
//! Pure functions only - no side effects, no I/O.

pub mod datetime;
pub mod text;

pub use datetime::parse_datetime;
pub use text::{capitalize, none_if_blank};
