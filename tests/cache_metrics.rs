mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use tasklane::application::metrics::{
    METRIC_LISTING_CACHE_ERROR_TOTAL, METRIC_LISTING_CACHE_HIT_TOTAL,
    METRIC_LISTING_CACHE_MISS_TOTAL, METRIC_LISTING_INVALIDATE_TOTAL,
    METRIC_TASKS_CREATED_TOTAL, METRIC_TASKS_DELETED_TOTAL, TaskMetrics,
};
use tasklane::application::query::TaskQuery;
use tasklane::application::tasks::CreateTaskCommand;
use tasklane::cache::MemoryCache;

use common::{FailingCache, InMemoryTasks, task_service};

fn recording_metrics() -> (TaskMetrics, Snapshotter) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (TaskMetrics::new(Arc::new(recorder)), snapshotter)
}

/// Counter values captured by a single snapshot.
///
/// Reading a `DebuggingRecorder` snapshot resets its counters, so every
/// assertion in a test must read from the same capture.
struct Counters {
    series: Vec<(String, Vec<(String, String)>, u64)>,
}

impl Counters {
    fn capture(snapshotter: &Snapshotter) -> Self {
        let series = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => {
                    let labels = key
                        .key()
                        .labels()
                        .map(|label| (label.key().to_string(), label.value().to_string()))
                        .collect();
                    Some((key.key().name().to_string(), labels, count))
                }
                _ => None,
            })
            .collect();
        Self { series }
    }

    /// Sum of every series with `name`.
    fn total(&self, name: &str) -> u64 {
        self.sum(name, None)
    }

    fn labelled(&self, name: &str, label_key: &str, label_value: &str) -> u64 {
        self.sum(name, Some((label_key, label_value)))
    }

    fn sum(&self, name: &str, label: Option<(&str, &str)>) -> u64 {
        self.series
            .iter()
            .filter(|(series, _, _)| series == name)
            .filter(|(_, labels, _)| {
                label.is_none_or(|(key, value)| {
                    labels.iter().any(|(k, v)| k == key && v == value)
                })
            })
            .map(|(_, _, count)| count)
            .sum()
    }
}

fn command(title: &str) -> CreateTaskCommand {
    CreateTaskCommand {
        title: title.to_string(),
        description: None,
        status: None,
        assignee_id: 1,
    }
}

#[tokio::test]
async fn hits_misses_and_invalidations_are_counted() {
    let (metrics, snapshotter) = recording_metrics();
    let store = InMemoryTasks::new();
    let backend = Arc::new(MemoryCache::new(NonZeroUsize::new(16).unwrap()));
    let service = task_service(store, Some(backend), metrics);

    let task = service.create(command("one")).await.unwrap();
    service.list(&TaskQuery::default()).await.unwrap();
    service.list(&TaskQuery::default()).await.unwrap();
    service.list(&TaskQuery::default()).await.unwrap();
    service.delete(task.id).await.unwrap();

    let counters = Counters::capture(&snapshotter);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_MISS_TOTAL), 1);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_HIT_TOTAL), 2);
    assert_eq!(counters.total(METRIC_LISTING_INVALIDATE_TOTAL), 2);
    assert_eq!(counters.total(METRIC_TASKS_CREATED_TOTAL), 1);
    assert_eq!(counters.total(METRIC_TASKS_DELETED_TOTAL), 1);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_ERROR_TOTAL), 0);
}

#[tokio::test]
async fn backend_failures_are_counted_by_stage() {
    let (metrics, snapshotter) = recording_metrics();
    let store = InMemoryTasks::new();
    let service = task_service(store, Some(Arc::new(FailingCache)), metrics);

    service.create(command("one")).await.unwrap();
    service.list(&TaskQuery::default()).await.unwrap();

    let counters = Counters::capture(&snapshotter);
    let error_with =
        |stage: &str| counters.labelled(METRIC_LISTING_CACHE_ERROR_TOTAL, "stage", stage);
    assert_eq!(error_with("invalidate"), 1);
    assert_eq!(error_with("read"), 1);
    assert_eq!(error_with("write"), 1);
    assert_eq!(error_with("decode"), 0);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_ERROR_TOTAL), 3);
    assert_eq!(counters.total(METRIC_LISTING_INVALIDATE_TOTAL), 0);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_MISS_TOTAL), 1);
}

#[tokio::test]
async fn disabled_cache_emits_no_listing_metrics() {
    let (metrics, snapshotter) = recording_metrics();
    let store = InMemoryTasks::new();
    let service = task_service(store, None, metrics);

    service.create(command("one")).await.unwrap();
    service.list(&TaskQuery::default()).await.unwrap();

    let counters = Counters::capture(&snapshotter);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_MISS_TOTAL), 0);
    assert_eq!(counters.total(METRIC_LISTING_CACHE_HIT_TOTAL), 0);
    assert_eq!(counters.total(METRIC_LISTING_INVALIDATE_TOTAL), 0);
    assert_eq!(counters.total(METRIC_TASKS_CREATED_TOTAL), 1);
}
