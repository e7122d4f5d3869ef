//! Metrics capability injected into the task service, the listing cache and
//! the HTTP layer.
//!
//! Emission goes through an explicit recorder handle instead of the process
//! global, so tests can observe metrics without installing anything.

use std::{fmt, sync::Arc, time::Duration};

use metrics::{
    NoopRecorder, Recorder, Unit, counter, describe_counter, describe_histogram, histogram,
};

pub const METRIC_HTTP_REQUESTS_TOTAL: &str = "tasklane_http_requests_total";
pub const METRIC_HTTP_REQUEST_MS: &str = "tasklane_http_request_ms";
pub const METRIC_TASK_OPERATION_MS: &str = "tasklane_task_operation_ms";
pub const METRIC_TASKS_CREATED_TOTAL: &str = "tasklane_tasks_created_total";
pub const METRIC_TASKS_DELETED_TOTAL: &str = "tasklane_tasks_deleted_total";
pub const METRIC_LISTING_CACHE_HIT_TOTAL: &str = "tasklane_listing_cache_hit_total";
pub const METRIC_LISTING_CACHE_MISS_TOTAL: &str = "tasklane_listing_cache_miss_total";
pub const METRIC_LISTING_CACHE_ERROR_TOTAL: &str = "tasklane_listing_cache_error_total";
pub const METRIC_LISTING_INVALIDATE_TOTAL: &str = "tasklane_listing_cache_invalidate_total";

/// Service operations timed by [`TaskMetrics::observe_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOperation {
    Create,
    Get,
    Update,
    Delete,
    List,
}

impl TaskOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskOperation::Create => "create",
            TaskOperation::Get => "get",
            TaskOperation::Update => "update",
            TaskOperation::Delete => "delete",
            TaskOperation::List => "list",
        }
    }
}

/// Cache stage that failed, used as the `stage` label on error counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStage {
    Read,
    Write,
    Decode,
    Invalidate,
}

impl CacheStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStage::Read => "read",
            CacheStage::Write => "write",
            CacheStage::Decode => "decode",
            CacheStage::Invalidate => "invalidate",
        }
    }
}

#[derive(Clone)]
pub struct TaskMetrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl fmt::Debug for TaskMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMetrics").finish_non_exhaustive()
    }
}

impl Default for TaskMetrics {
    fn default() -> Self {
        Self::noop()
    }
}

impl TaskMetrics {
    pub fn new(recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        Self { recorder }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopRecorder))
    }

    fn emit<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    /// Register help text and units with the recorder.
    pub fn describe(&self) {
        self.emit(|| {
            describe_counter!(
                METRIC_HTTP_REQUESTS_TOTAL,
                Unit::Count,
                "Total number of HTTP requests by method and status."
            );
            describe_histogram!(
                METRIC_HTTP_REQUEST_MS,
                Unit::Milliseconds,
                "HTTP request latency in milliseconds."
            );
            describe_histogram!(
                METRIC_TASK_OPERATION_MS,
                Unit::Milliseconds,
                "Task service operation latency in milliseconds."
            );
            describe_counter!(
                METRIC_TASKS_CREATED_TOTAL,
                Unit::Count,
                "Total number of tasks created."
            );
            describe_counter!(
                METRIC_TASKS_DELETED_TOTAL,
                Unit::Count,
                "Total number of tasks deleted."
            );
            describe_counter!(
                METRIC_LISTING_CACHE_HIT_TOTAL,
                Unit::Count,
                "Total number of task listings served from cache."
            );
            describe_counter!(
                METRIC_LISTING_CACHE_MISS_TOTAL,
                Unit::Count,
                "Total number of task listings loaded from the store."
            );
            describe_counter!(
                METRIC_LISTING_CACHE_ERROR_TOTAL,
                Unit::Count,
                "Total number of listing cache failures by stage."
            );
            describe_counter!(
                METRIC_LISTING_INVALIDATE_TOTAL,
                Unit::Count,
                "Total number of listing cache invalidations."
            );
        });
    }

    pub fn observe_operation(&self, operation: TaskOperation, success: bool, elapsed: Duration) {
        let outcome = if success { "success" } else { "error" };
        self.emit(|| {
            histogram!(
                METRIC_TASK_OPERATION_MS,
                "operation" => operation.as_str(),
                "outcome" => outcome
            )
            .record(elapsed.as_secs_f64() * 1000.0);
        });
    }

    pub fn task_created(&self) {
        self.emit(|| counter!(METRIC_TASKS_CREATED_TOTAL).increment(1));
    }

    pub fn task_deleted(&self) {
        self.emit(|| counter!(METRIC_TASKS_DELETED_TOTAL).increment(1));
    }

    pub fn listing_hit(&self) {
        self.emit(|| counter!(METRIC_LISTING_CACHE_HIT_TOTAL).increment(1));
    }

    pub fn listing_miss(&self) {
        self.emit(|| counter!(METRIC_LISTING_CACHE_MISS_TOTAL).increment(1));
    }

    pub fn listing_error(&self, stage: CacheStage) {
        self.emit(|| {
            counter!(METRIC_LISTING_CACHE_ERROR_TOTAL, "stage" => stage.as_str()).increment(1)
        });
    }

    pub fn listing_invalidated(&self) {
        self.emit(|| counter!(METRIC_LISTING_INVALIDATE_TOTAL).increment(1));
    }

    pub fn observe_http(&self, method: &str, status: u16, elapsed: Duration) {
        let method = method.to_string();
        let status = status.to_string();
        self.emit(|| {
            counter!(
                METRIC_HTTP_REQUESTS_TOTAL,
                "method" => method.clone(),
                "status" => status.clone()
            )
            .increment(1);
            histogram!(METRIC_HTTP_REQUEST_MS, "method" => method, "status" => status)
                .record(elapsed.as_secs_f64() * 1000.0);
        });
    }
}
