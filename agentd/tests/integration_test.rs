//! End-to-end tests against the HTTP surface: an in-process server, a
//! scripted LLM client, and no real Docker/webhook endpoint. The background
//! worker is expected to run and fail fast (the mock LLM has no scripted
//! responses), which exercises the full intake -> registry -> worker ->
//! status pipeline without depending on external infrastructure.

use std::sync::Arc;
use std::time::Duration;

use agentd::config::Config;
use agentd::llm::client::mock::MockLlmClient;
use agentd::service::{router, AppState, TaskRegistry};
use serde_json::json;
use tempfile::TempDir;

async fn spawn_server(webhook_secret: Option<&str>) -> (String, TempDir, Arc<AppState>) {
    let workspace_dir = TempDir::new().expect("tempdir");

    let mut config = Config::default();
    config.service.bind_addr = "127.0.0.1:0".to_string();
    config.service.webhook_secret = webhook_secret.map(str::to_string);
    config.service.workspace_root = workspace_dir.path().to_path_buf();

    let llm = Arc::new(MockLlmClient::new(vec![]));
    let state = Arc::new(AppState { config: Arc::new(config), llm, registry: TaskRegistry::new(), webhook: None });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(Arc::clone(&state));

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server exits cleanly");
    });

    (format!("http://{addr}"), workspace_dir, state)
}

fn task_payload(task_id: &str) -> serde_json::Value {
    json!({
        "task_id": task_id,
        "title": "demo task",
        "prompt": "do the thing",
        "user_id": "U-1",
    })
}

#[tokio::test]
async fn test_health_endpoint_reports_ok() {
    let (base_url, _workspace, _state) = spawn_server(None).await;
    let resp = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["sandbox_ready"].is_boolean());
}

#[tokio::test]
async fn test_execute_task_rejects_missing_auth() {
    let (base_url, _workspace, _state) = spawn_server(Some("shared-secret")).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base_url}/tasks/execute")).json(&task_payload("T-1")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_execute_task_rejects_wrong_auth() {
    let (base_url, _workspace, _state) = spawn_server(Some("shared-secret")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base_url}/tasks/execute"))
        .bearer_auth("wrong-token")
        .json(&task_payload("T-2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_execute_task_accepts_with_correct_auth_and_eventually_fails() {
    let (base_url, _workspace, _state) = spawn_server(Some("shared-secret")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base_url}/tasks/execute"))
        .bearer_auth("shared-secret")
        .json(&task_payload("T-3"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    // The mock LLM has no scripted responses, so the planner's first call
    // fails immediately and the worker marks the task failed.
    let mut status = json!({});
    for _ in 0..20 {
        let resp = client.get(format!("{base_url}/tasks/T-3/status")).send().await.unwrap();
        if resp.status() == 200 {
            status = resp.json().await.unwrap();
            if status["status"] != "queued" && status["status"] != "running" {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status["status"], "failed");
    assert!(status["error"].as_str().is_some());
}

#[tokio::test]
async fn test_execute_task_rejects_duplicate_live_task() {
    let (base_url, _workspace, state) = spawn_server(None).await;
    let client = reqwest::Client::new();

    // Pre-register the id as already live, rather than racing the real
    // request against the background worker's own state transitions.
    state.registry.register("T-4").await;

    let resp = client.post(format!("{base_url}/tasks/execute")).json(&task_payload("T-4")).send().await.unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_task_status_unknown_task_is_not_found() {
    let (base_url, _workspace, _state) = spawn_server(None).await;
    let resp = reqwest::get(format!("{base_url}/tasks/does-not-exist/status")).await.unwrap();
    assert_eq!(resp.status(), 404);
}
