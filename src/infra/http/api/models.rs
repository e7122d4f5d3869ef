use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::query::TaskQuery;
use crate::domain::{entities::TaskRecord, types::TaskStatus};

pub const SUCCESS_MESSAGE: &str = "success";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Ok,
    Fail,
}

/// Uniform response body for every endpoint under `/api`.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub status: EnvelopeStatus,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            message: SUCCESS_MESSAGE.to_string(),
            errors: Vec::new(),
            status: EnvelopeStatus::Ok,
        }
    }

    pub fn with_meta(mut self, meta: PaginationMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiEnvelope<()> {
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            data: None,
            meta: None,
            message: message.into(),
            errors,
            status: EnvelopeStatus::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(query: &TaskQuery, total: u64) -> Self {
        Self {
            page: query.page,
            per_page: query.per_page,
            total,
            total_pages: query.total_pages(total),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub assignee_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub assignee_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<TaskRecord> for TaskResponse {
    fn from(task: TaskRecord) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            assignee_id: task.assignee_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
