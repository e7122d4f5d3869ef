//! Task management HTTP service with a cache-aside layer for paginated task
//! listings.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
