//! API handlers organized by resource type.

mod tasks;

pub use tasks::*;

use axum::extract::rejection::{JsonRejection, PathRejection};

use super::error::{ApiError, messages};

pub(crate) fn json_rejection(source: &'static str, rejection: JsonRejection) -> ApiError {
    ApiError::validation(source, vec![rejection.body_text()])
}

pub(crate) fn path_rejection(source: &'static str, _rejection: PathRejection) -> ApiError {
    ApiError::validation(source, vec![messages::INVALID_TASK_ID.to_string()])
}
