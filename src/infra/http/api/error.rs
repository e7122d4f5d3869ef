use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::tasks::TaskServiceError;

use super::models::ApiEnvelope;

pub mod messages {
    pub const VALIDATION: &str = "validation error";
    pub const NOT_FOUND: &str = "Not Found!";
    pub const INTERNAL: &str = "Internal Server Error";
    pub const INVALID_TASK_ID: &str = "Invalid task ID";
    pub const REQUEST_TIMEOUT: &str = "Request Timeout";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    errors: Vec<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn validation(source: &'static str, errors: Vec<String>) -> Self {
        let report = ErrorReport {
            source,
            status: StatusCode::BAD_REQUEST,
            messages: errors.clone(),
        };
        Self {
            status: StatusCode::BAD_REQUEST,
            message: messages::VALIDATION,
            errors,
            report,
        }
    }

    pub fn not_found(source: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: messages::NOT_FOUND,
            errors: Vec::new(),
            report: ErrorReport::from_message(source, StatusCode::NOT_FOUND, "resource not found"),
        }
    }

    pub fn internal(source: &'static str, error: &dyn std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: messages::INTERNAL,
            errors: Vec::new(),
            report: ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error),
        }
    }

    /// A handler that panicked; `detail` is the panic payload when it is a string.
    pub fn panicked(source: &'static str, detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: messages::INTERNAL,
            errors: Vec::new(),
            report: ErrorReport::from_message(source, StatusCode::INTERNAL_SERVER_ERROR, detail),
        }
    }

    pub fn timeout(source: &'static str) -> Self {
        Self {
            status: StatusCode::REQUEST_TIMEOUT,
            message: messages::REQUEST_TIMEOUT,
            errors: Vec::new(),
            report: ErrorReport::from_message(
                source,
                StatusCode::REQUEST_TIMEOUT,
                "request exceeded the configured timeout",
            ),
        }
    }

    pub fn from_service(source: &'static str, error: TaskServiceError) -> Self {
        match error {
            TaskServiceError::Domain(err) => Self::validation(source, vec![err.detail().to_string()]),
            err if err.is_not_found() => Self::not_found(source),
            err => Self::internal(source, &err),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiEnvelope::failure(self.message, self.errors);
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
