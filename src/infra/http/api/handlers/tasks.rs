//! Task handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::query::TaskQuery;
use crate::application::tasks::{CreateTaskCommand, UpdateTaskCommand};

use super::{json_rejection, path_rejection};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

const SOURCE_LIST: &str = "infra::http::api::list_tasks";
const SOURCE_CREATE: &str = "infra::http::api::create_task";
const SOURCE_GET: &str = "infra::http::api::get_task";
const SOURCE_UPDATE: &str = "infra::http::api::update_task";
const SOURCE_DELETE: &str = "infra::http::api::delete_task";

pub async fn list_tasks(
    State(state): State<ApiState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) =
        params.map_err(|err| ApiError::validation(SOURCE_LIST, vec![err.body_text()]))?;
    let query = TaskQuery::from_params(params);

    let page = state
        .tasks
        .list(&query)
        .await
        .map_err(|err| ApiError::from_service(SOURCE_LIST, err))?;

    let meta = PaginationMeta::new(&query, page.total);
    let items: Vec<TaskResponse> = page.items.into_iter().map(TaskResponse::from).collect();
    Ok(Json(ApiEnvelope::success(items).with_meta(meta)))
}

pub async fn create_task(
    State(state): State<ApiState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|err| json_rejection(SOURCE_CREATE, err))?;

    let command = CreateTaskCommand {
        title: payload.title,
        description: payload.description,
        status: payload.status,
        assignee_id: payload.assignee_id,
    };

    let task = state
        .tasks
        .create(command)
        .await
        .map_err(|err| ApiError::from_service(SOURCE_CREATE, err))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::success(TaskResponse::from(task))),
    ))
}

pub async fn get_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|err| path_rejection(SOURCE_GET, err))?;

    let task = state
        .tasks
        .get(id)
        .await
        .map_err(|err| ApiError::from_service(SOURCE_GET, err))?;

    Ok(Json(ApiEnvelope::success(TaskResponse::from(task))))
}

pub async fn update_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|err| path_rejection(SOURCE_UPDATE, err))?;
    let Json(payload) = payload.map_err(|err| json_rejection(SOURCE_UPDATE, err))?;

    let command = UpdateTaskCommand {
        id,
        title: payload.title,
        description: payload.description,
        status: payload.status,
        assignee_id: payload.assignee_id,
    };

    let task = state
        .tasks
        .update(command)
        .await
        .map_err(|err| ApiError::from_service(SOURCE_UPDATE, err))?;

    Ok(Json(ApiEnvelope::success(TaskResponse::from(task))))
}

pub async fn delete_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|err| path_rejection(SOURCE_DELETE, err))?;

    state
        .tasks
        .delete(id)
        .await
        .map_err(|err| ApiError::from_service(SOURCE_DELETE, err))?;

    Ok(StatusCode::NO_CONTENT)
}
