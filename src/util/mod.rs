//! Shared helpers

pub mod math;
pub mod time;
