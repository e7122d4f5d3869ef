//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::query::TaskQuery;
use crate::domain::entities::TaskRecord;
use crate::domain::types::TaskStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: i64,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskParams {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: i64,
}

/// One page of a task listing together with the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<TaskRecord>,
    pub total: u64,
}

#[async_trait]
pub trait TasksRepo: Send + Sync {
    async fn create_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError>;

    /// Returns `RepoError::NotFound` when no task has the given id.
    async fn find_task(&self, id: i64) -> Result<TaskRecord, RepoError>;

    /// Returns `RepoError::NotFound` when no task has the given id.
    async fn update_task(&self, params: UpdateTaskParams) -> Result<TaskRecord, RepoError>;

    /// Returns `RepoError::NotFound` when nothing was deleted.
    async fn delete_task(&self, id: i64) -> Result<(), RepoError>;

    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
