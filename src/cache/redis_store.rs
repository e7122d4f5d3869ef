//! Shared listing cache stored in Redis.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;

use super::backend::{CacheBackend, CacheError};

const SCAN_BATCH: usize = 200;

pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn from_url(redis_url: &str) -> Result<Self, CacheError> {
        let config = Config::from_url(redis_url);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(CacheError::unavailable)?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(CacheError::unavailable)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection().await?;
        let value: Option<String> = connection.get(key).await.map_err(CacheError::operation)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection().await?;
        let _: () = connection
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(CacheError::operation)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection().await?;
        let _: u64 = connection.del(key).await.map_err(CacheError::operation)?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut connection = self.connection().await?;
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *connection)
                .await
                .map_err(CacheError::operation)?;

            if !keys.is_empty() {
                let deleted: u64 = connection.del(&keys).await.map_err(CacheError::operation)?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}

/// Escape glob metacharacters so the prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
