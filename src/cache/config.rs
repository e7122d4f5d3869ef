//! Cache configuration.
//!
//! Selects the listing cache backend and its tuning knobs from the `[cache]`
//! section of the settings file.

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

use super::keys::DEFAULT_LISTING_PREFIX;
use crate::config::{
    CacheSettings, DEFAULT_CACHE_INVALIDATION_TIMEOUT_MS, DEFAULT_CACHE_MEMORY_CAPACITY,
    DEFAULT_CACHE_OPERATION_TIMEOUT_MS, DEFAULT_CACHE_TTL_SECS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Redis,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Lifetime of a cached listing page.
    pub ttl_seconds: u64,
    /// Maximum number of listing pages held by the in-process backend.
    pub memory_capacity: usize,
    /// Upper bound for a single get, set or delete before it counts as a failure.
    pub operation_timeout_ms: u64,
    /// Upper bound for dropping the whole listing namespace after a write.
    pub invalidation_timeout_ms: u64,
    pub key_prefix: String,
    /// Replace the readable key suffix with a SHA-256 digest.
    pub hash_keys: bool,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            memory_capacity: DEFAULT_CACHE_MEMORY_CAPACITY,
            operation_timeout_ms: DEFAULT_CACHE_OPERATION_TIMEOUT_MS,
            invalidation_timeout_ms: DEFAULT_CACHE_INVALIDATION_TIMEOUT_MS,
            key_prefix: DEFAULT_LISTING_PREFIX.to_string(),
            hash_keys: false,
            redis_url: None,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            ttl_seconds: settings.ttl_seconds.get(),
            memory_capacity: settings.memory_capacity.get(),
            operation_timeout_ms: settings.operation_timeout_ms.get(),
            invalidation_timeout_ms: settings.invalidation_timeout_ms.get(),
            key_prefix: settings.key_prefix.clone(),
            hash_keys: settings.hash_keys,
            redis_url: settings.redis_url.clone(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.backend != CacheBackendKind::Disabled
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(1))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }

    pub fn invalidation_timeout(&self) -> Duration {
        Duration::from_millis(self.invalidation_timeout_ms.max(1))
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
