use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::{metrics::TaskMetrics, repos::TasksRepo, tasks::TaskService};

#[derive(Clone)]
pub struct ApiState {
    pub tasks: Arc<TaskService>,
    /// Store handle used by the health check.
    pub store: Arc<dyn TasksRepo>,
    pub metrics: TaskMetrics,
    /// Renders the Prometheus exposition; `None` when the endpoint is disabled.
    pub exporter: Option<PrometheusHandle>,
}
