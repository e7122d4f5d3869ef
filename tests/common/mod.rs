//! In-memory fakes shared by the integration suites.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use tasklane::application::metrics::TaskMetrics;
use tasklane::application::query::TaskQuery;
use tasklane::application::repos::{
    CreateTaskParams, RepoError, TaskPage, TasksRepo, UpdateTaskParams,
};
use tasklane::application::tasks::TaskService;
use tasklane::cache::{CacheBackend, CacheConfig, CacheError, MemoryCache, TaskListCache};
use tasklane::domain::entities::TaskRecord;

/// Task store kept in a map, with call counters and switchable failures.
#[derive(Default)]
pub struct InMemoryTasks {
    tasks: Mutex<BTreeMap<i64, TaskRecord>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    fail_lists: AtomicBool,
    stall_lists: AtomicBool,
    panic_lists: AtomicBool,
    fail_finds: AtomicBool,
    fail_writes: AtomicBool,
    unhealthy: AtomicBool,
}

impl InMemoryTasks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Listings never complete.
    pub fn stall_lists(&self, stall: bool) {
        self.stall_lists.store(stall, Ordering::SeqCst);
    }

    /// Listings panic inside the store.
    pub fn panic_lists(&self, panic: bool) {
        self.panic_lists.store(panic, Ordering::SeqCst);
    }

    /// Lookups by id fail with a persistence error instead of answering.
    pub fn fail_finds(&self, fail: bool) {
        self.fail_finds.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("store is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl TasksRepo for InMemoryTasks {
    async fn create_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError> {
        self.check_writes()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = OffsetDateTime::now_utc();
        let task = TaskRecord {
            id,
            title: params.title,
            description: params.description,
            status: params.status,
            assignee_id: params.assignee_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().await.insert(id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i64) -> Result<TaskRecord, RepoError> {
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection reset by peer"));
        }
        self.tasks
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update_task(&self, params: UpdateTaskParams) -> Result<TaskRecord, RepoError> {
        self.check_writes()?;
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        task.title = params.title;
        task.description = params.description;
        task.status = params.status;
        task.assignee_id = params.assignee_id;
        task.updated_at = OffsetDateTime::now_utc();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i64) -> Result<(), RepoError> {
        self.check_writes()?;
        self.tasks
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        if self.stall_lists.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.panic_lists.load(Ordering::SeqCst) {
            panic!("task store listing exploded");
        }
        let filter = query
            .typed_filter()
            .map_err(|err| RepoError::InvalidInput {
                message: err.detail().to_string(),
            })?;

        let tasks = self.tasks.lock().await;
        let matching: Vec<TaskRecord> = tasks
            .values()
            .filter(|task| filter.title.as_deref().is_none_or(|title| task.title == title))
            .filter(|task| filter.status.is_none_or(|status| task.status == status))
            .filter(|task| {
                filter
                    .assignee_id
                    .is_none_or(|assignee| task.assignee_id == assignee)
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok(TaskPage { items, total })
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

/// Backend whose every operation fails.
pub struct FailingCache;

#[async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}

/// Backend that never answers within any reasonable timeout.
pub struct StalledCache;

#[async_trait]
impl CacheBackend for StalledCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        std::future::pending().await
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        std::future::pending().await
    }
}

/// Memory backend whose prefix sweep takes longer than one cache operation
/// is allowed to, but finishes well inside the invalidation budget.
pub struct SlowInvalidationCache {
    inner: MemoryCache,
    sweep_delay: Duration,
}

impl SlowInvalidationCache {
    pub fn new(sweep_delay: Duration) -> Self {
        Self {
            inner: MemoryCache::new(NonZeroUsize::new(64).expect("non-zero capacity")),
            sweep_delay,
        }
    }
}

#[async_trait]
impl CacheBackend for SlowInvalidationCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        tokio::time::sleep(self.sweep_delay).await;
        self.inner.delete_prefix(prefix).await
    }
}

pub fn memory_config() -> CacheConfig {
    CacheConfig::default()
}

pub fn task_service(
    store: Arc<dyn TasksRepo>,
    backend: Option<Arc<dyn CacheBackend>>,
    metrics: TaskMetrics,
) -> TaskService {
    let listings = Arc::new(TaskListCache::new(
        store.clone(),
        backend,
        &memory_config(),
        metrics.clone(),
    ));
    TaskService::new(store, listings, metrics)
}
