//! Shared utilities

pub mod location;
pub mod time;
