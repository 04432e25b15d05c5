//! HTTP surface: task intake, status polling, and a liveness probe.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::domain::TaskRequest;
use crate::llm::LlmClient;

use super::registry::{RegisterResult, TaskRegistry};
use super::webhook::WebhookSender;
use super::worker;

pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn LlmClient>,
    pub registry: TaskRegistry,
    pub webhook: Option<Arc<WebhookSender>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks/execute", post(execute_task))
        .route("/tasks/{task_id}/status", get(task_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sandbox_ready: bool,
}

#[tracing::instrument(skip_all)]
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sandbox_ready = crate::sandbox::DockerBackend::connect(state.config.sandbox.clone()).is_ok();
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION"), sandbox_ready })
}

#[derive(Serialize)]
struct AcceptedResponse {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

#[tracing::instrument(skip_all, fields(task_id = %task.task_id))]
async fn execute_task(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(task): Json<TaskRequest>) -> impl IntoResponse {
    if let Some(secret) = state.config.service.webhook_secret.as_deref() {
        if !bearer_matches(&headers, secret) {
            return (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "unauthorized".to_string() })).into_response();
        }
    }

    match state.registry.register(&task.task_id).await {
        RegisterResult::Duplicate => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse { error: format!("task '{}' is already running", task.task_id) }),
            )
                .into_response();
        }
        RegisterResult::Registered => {}
    }

    info!(task_id = %task.task_id, "execute_task: accepted");

    let config = Arc::clone(&state.config);
    let llm = Arc::clone(&state.llm);
    let registry = state.registry.clone();
    let webhook = state.webhook.clone();
    tokio::spawn(async move {
        worker::execute(task, config, llm, registry, webhook).await;
    });

    (StatusCode::ACCEPTED, Json(AcceptedResponse { status: "accepted".to_string(), message: "task queued for execution".to_string() })).into_response()
}

#[tracing::instrument(skip(state))]
async fn task_status(State(state): State<Arc<AppState>>, Path(task_id): Path<String>) -> impl IntoResponse {
    match state.registry.get(&task_id).await {
        Some(record) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, Json(ErrorResponse { error: format!("task '{task_id}' not found") })).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_matches_accepts_exact_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret123"));
        assert!(bearer_matches(&headers, "secret123"));
    }

    #[test]
    fn test_bearer_matches_rejects_wrong_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer wrong"));
        assert!(!bearer_matches(&headers, "secret123"));
    }

    #[test]
    fn test_bearer_matches_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(!bearer_matches(&headers, "secret123"));
    }
}
