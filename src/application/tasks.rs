//! Task use cases: input validation, timing and routing to the store or the
//! listing cache.

use std::{future::Future, sync::Arc, time::Instant};

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::{
    metrics::{TaskMetrics, TaskOperation},
    query::TaskQuery,
    repos::{CreateTaskParams, RepoError, TaskPage, TasksRepo, UpdateTaskParams},
};
use crate::cache::TaskListCache;
use crate::domain::{entities::TaskRecord, error::DomainError, types::TaskStatus};

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl TaskServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskServiceError::Repo(RepoError::NotFound))
    }
}

#[derive(Debug, Clone)]
pub struct CreateTaskCommand {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to `pending` when absent.
    pub status: Option<String>,
    pub assignee_id: i64,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskCommand {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee_id: i64,
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TasksRepo>,
    listings: Arc<TaskListCache>,
    metrics: TaskMetrics,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TasksRepo>,
        listings: Arc<TaskListCache>,
        metrics: TaskMetrics,
    ) -> Self {
        Self {
            store,
            listings,
            metrics,
        }
    }

    #[instrument(skip(self, command), fields(assignee_id = command.assignee_id))]
    pub async fn create(&self, command: CreateTaskCommand) -> Result<TaskRecord, TaskServiceError> {
        self.timed(TaskOperation::Create, async {
            let title = normalize_title(&command.title)?;
            let assignee_id = require_assignee(command.assignee_id)?;
            let status = match command.status.as_deref() {
                Some(raw) => raw.parse::<TaskStatus>()?,
                None => TaskStatus::default(),
            };
            let params = CreateTaskParams {
                title,
                description: normalize_description(command.description),
                status,
                assignee_id,
            };

            let task = self.listings.create(params).await?;
            self.metrics.task_created();
            info!(task_id = task.id, status = %task.status, "Task created");
            Ok(task)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<TaskRecord, TaskServiceError> {
        self.timed(TaskOperation::Get, async {
            Ok(self.store.find_task(id).await?)
        })
        .await
    }

    #[instrument(skip(self, command), fields(task_id = command.id))]
    pub async fn update(&self, command: UpdateTaskCommand) -> Result<TaskRecord, TaskServiceError> {
        self.timed(TaskOperation::Update, async {
            let title = normalize_title(&command.title)?;
            let assignee_id = require_assignee(command.assignee_id)?;
            let status = command.status.parse::<TaskStatus>()?;
            let params = UpdateTaskParams {
                id: command.id,
                title,
                description: normalize_description(command.description),
                status,
                assignee_id,
            };

            let task = self.listings.update(params).await?;
            info!(task_id = task.id, status = %task.status, "Task updated");
            Ok(task)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), TaskServiceError> {
        self.timed(TaskOperation::Delete, async {
            self.listings.delete(id).await?;
            self.metrics.task_deleted();
            info!(task_id = id, "Task deleted");
            Ok(())
        })
        .await
    }

    /// List tasks matching `query`. Filters are validated and canonicalized
    /// before the cache or the store is consulted.
    pub async fn list(&self, query: &TaskQuery) -> Result<TaskPage, TaskServiceError> {
        self.timed(TaskOperation::List, async {
            let query = query.normalized()?;
            Ok(self.listings.list(&query).await?)
        })
        .await
    }

    async fn timed<T, F>(&self, operation: TaskOperation, work: F) -> Result<T, TaskServiceError>
    where
        F: Future<Output = Result<T, TaskServiceError>>,
    {
        let started = Instant::now();
        let result = work.await;
        self.metrics
            .observe_operation(operation, result.is_ok(), started.elapsed());
        result
    }
}

fn normalize_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

/// Zero is the unset id and never names an assignee.
fn require_assignee(assignee_id: i64) -> Result<i64, DomainError> {
    if assignee_id == 0 {
        return Err(DomainError::validation("assignee_id is required"));
    }
    Ok(assignee_id)
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.filter(|description| !description.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed() {
        assert_eq!(normalize_title("  ship it \n").expect("valid"), "ship it");
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = normalize_title(" \t ").expect_err("blank title");
        assert_eq!(err.detail(), "title must not be empty");
    }

    #[test]
    fn zero_assignee_is_rejected() {
        let err = require_assignee(0).expect_err("zero assignee");
        assert_eq!(err.detail(), "assignee_id is required");
        assert_eq!(require_assignee(17).expect("valid"), 17);
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(normalize_description(Some("   ".into())), None);
        assert_eq!(
            normalize_description(Some("details".into())),
            Some("details".to_string())
        );
        assert_eq!(normalize_description(None), None);
    }

    #[test]
    fn not_found_is_detected() {
        assert!(TaskServiceError::Repo(RepoError::NotFound).is_not_found());
        assert!(!TaskServiceError::Domain(DomainError::validation("x")).is_not_found());
    }
}
