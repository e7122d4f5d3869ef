//! Application services layer.

pub mod error;
pub mod metrics;
pub mod query;
pub mod repos;
pub mod tasks;
