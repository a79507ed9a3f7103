//! CLI command implementations.

pub mod clean;
pub mod profile;
pub mod report_change;
pub mod validate;
