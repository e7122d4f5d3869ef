//! Listing cache
//!
//! Caches paginated task listings in front of the task store:
//!
//! - **Backends**: an in-process LRU or a shared Redis instance, behind
//!   [`CacheBackend`]
//! - **Keys**: deterministic, prefix-scoped encoding of the listing query
//! - **Coordinator**: [`TaskListCache`] applies cache-aside reads and coarse
//!   invalidation on every write
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"   # memory | redis | disabled
//! ttl_seconds = 600
//! key_prefix = "tasks:list:"
//! # redis_url = "redis://127.0.0.1:6379"
//! ```

mod backend;
mod config;
mod keys;
mod listing;
mod lock;
mod memory;
mod redis_store;

pub use backend::{CacheBackend, CacheError};
pub use config::{CacheBackendKind, CacheConfig};
pub use keys::{DEFAULT_LISTING_PREFIX, ListingKeyEncoder};
pub use listing::TaskListCache;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;
