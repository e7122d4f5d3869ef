//! Cache-aside coordinator for paginated task listings.
//!
//! Reads consult the backend first and fall back to the store on a miss or on
//! any cache failure. Writes hit the store first and then drop every cached
//! listing, since any mutation can change any page of any filter combination.
//! The cache never turns a successful store operation into a failure.

use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::application::{
    metrics::{CacheStage, TaskMetrics},
    query::TaskQuery,
    repos::{CreateTaskParams, RepoError, TaskPage, TasksRepo, UpdateTaskParams},
};
use crate::domain::entities::TaskRecord;

use super::{
    backend::{CacheBackend, CacheError},
    config::CacheConfig,
    keys::ListingKeyEncoder,
};

pub struct TaskListCache {
    store: Arc<dyn TasksRepo>,
    backend: Option<Arc<dyn CacheBackend>>,
    encoder: ListingKeyEncoder,
    ttl: Duration,
    operation_timeout: Duration,
    invalidation_timeout: Duration,
    metrics: TaskMetrics,
}

impl TaskListCache {
    pub fn new(
        store: Arc<dyn TasksRepo>,
        backend: Option<Arc<dyn CacheBackend>>,
        config: &CacheConfig,
        metrics: TaskMetrics,
    ) -> Self {
        let backend = backend.filter(|_| config.is_enabled());
        Self {
            store,
            backend,
            encoder: ListingKeyEncoder::new(config.key_prefix.clone(), config.hash_keys),
            ttl: config.ttl(),
            operation_timeout: config.operation_timeout(),
            invalidation_timeout: config.invalidation_timeout(),
            metrics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn encoder(&self) -> &ListingKeyEncoder {
        &self.encoder
    }

    pub async fn list(&self, query: &TaskQuery) -> Result<TaskPage, RepoError> {
        let Some(backend) = self.backend.as_deref() else {
            return self.store.list_tasks(query).await;
        };

        let key = self.encoder.encode(query);
        if let Some(page) = self.lookup(backend, &key).await {
            self.metrics.listing_hit();
            return Ok(page);
        }
        self.metrics.listing_miss();

        let page = self.store.list_tasks(query).await?;
        self.populate(backend, &key, &page).await;
        Ok(page)
    }

    pub async fn create(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError> {
        let task = self.store.create_task(params).await?;
        self.invalidate_listings("create").await;
        Ok(task)
    }

    pub async fn update(&self, params: UpdateTaskParams) -> Result<TaskRecord, RepoError> {
        let task = self.store.update_task(params).await?;
        self.invalidate_listings("update").await;
        Ok(task)
    }

    pub async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.store.delete_task(id).await?;
        self.invalidate_listings("delete").await;
        Ok(())
    }

    /// Drop every cached listing. Returns the number of removed entries.
    ///
    /// A prefix sweep may walk the whole keyspace, so it runs under the
    /// invalidation timeout rather than the per-operation one.
    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let Some(backend) = self.backend.as_deref() else {
            return Ok(0);
        };
        within(
            self.invalidation_timeout,
            backend.delete_prefix(self.encoder.prefix()),
        )
        .await
    }

    async fn lookup(&self, backend: &dyn CacheBackend, key: &str) -> Option<TaskPage> {
        let payload = match self.bounded(backend.get(key)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                self.metrics.listing_error(CacheStage::Read);
                warn!(key, error = %err, "Listing cache read failed; reading from store");
                return None;
            }
        };

        match serde_json::from_str::<TaskPage>(&payload) {
            Ok(page) => Some(page),
            Err(err) => {
                self.metrics.listing_error(CacheStage::Decode);
                warn!(key, error = %err, "Discarding undecodable listing cache entry");
                if let Err(err) = self.bounded(backend.delete(key)).await {
                    debug!(key, error = %err, "Failed to delete undecodable listing entry");
                }
                None
            }
        }
    }

    async fn populate(&self, backend: &dyn CacheBackend, key: &str, page: &TaskPage) {
        let payload = match serde_json::to_string(page) {
            Ok(payload) => payload,
            Err(err) => {
                self.metrics.listing_error(CacheStage::Write);
                warn!(key, error = %err, "Failed to encode listing for cache");
                return;
            }
        };

        if let Err(err) = self.bounded(backend.set(key, payload, self.ttl)).await {
            self.metrics.listing_error(CacheStage::Write);
            warn!(key, error = %err, "Listing cache write failed");
        }
    }

    async fn invalidate_listings(&self, operation: &'static str) {
        if self.backend.is_none() {
            return;
        }
        match self.invalidate_all().await {
            Ok(removed) => {
                self.metrics.listing_invalidated();
                debug!(operation, removed, "Invalidated cached task listings");
            }
            Err(err) => {
                self.metrics.listing_error(CacheStage::Invalidate);
                warn!(
                    operation,
                    prefix = self.encoder.prefix(),
                    error = %err,
                    "Listing cache invalidation failed; stale pages expire with their TTL"
                );
            }
        }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        within(self.operation_timeout, operation).await
    }
}

async fn within<T, F>(limit: Duration, operation: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(limit)),
    }
}
