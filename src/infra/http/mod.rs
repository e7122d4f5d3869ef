pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use std::{any::Any as PanicPayload, time::Duration};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::application::{error::ErrorReport, repos::RepoError};

use self::api::error::ApiError;
use self::middleware::{log_responses, set_request_context, track_metrics};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Assemble the full HTTP surface: task API, health check, optional metrics
/// endpoint and the JSON 404 fallback.
///
/// Handlers that panic answer with the 500 envelope; handlers still running
/// after `request_timeout` answer with a 408 envelope.
pub fn build_router(
    state: ApiState,
    metrics_path: Option<&str>,
    request_timeout: Duration,
) -> Router {
    let metrics = state.metrics.clone();

    let mut router = build_api_router().route("/health", get(health));
    if let Some(path) = metrics_path.filter(|_| state.exporter.is_some()) {
        router = router.route(path, get(render_metrics));
    }

    router
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(axum_middleware::map_response(timeout_envelope))
        .layer(axum_middleware::from_fn_with_state(metrics, track_metrics))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .layer(cors_layer())
}

/// Router for a dedicated metrics listener.
pub fn build_metrics_router(exporter: PrometheusHandle, path: &str) -> Router {
    Router::new()
        .route(path, get(render_exporter))
        .fallback(not_found)
        .with_state(exporter)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.store.health_check().await)
}

async fn render_metrics(State(state): State<ApiState>) -> Response {
    match state.exporter.as_ref() {
        Some(handle) => exposition(handle),
        None => ApiError::not_found("infra::http::metrics").into_response(),
    }
}

async fn render_exporter(State(handle): State<PrometheusHandle>) -> Response {
    exposition(&handle)
}

fn exposition(handle: &PrometheusHandle) -> Response {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
        .into_response()
}

fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::panicked("infra::http::panic", detail).into_response()
}

/// The timeout layer answers with a bare 408; give it the JSON envelope.
async fn timeout_envelope(response: Response) -> Response {
    let bare_timeout = response.status() == StatusCode::REQUEST_TIMEOUT
        && response.extensions().get::<ErrorReport>().is_none();
    if bare_timeout {
        return ApiError::timeout("infra::http::timeout").into_response();
    }
    response
}

async fn not_found() -> ApiError {
    ApiError::not_found("infra::http::fallback")
}
