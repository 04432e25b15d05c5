//! Per-task background worker: the lifecycle in §4.8, one spawned task per
//! in-flight task execution.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::domain::{TaskRequest, TaskStatus};
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::r#loop::AgentLoop;
use crate::planner::Planner;
use crate::router::ModelTier;
use crate::sandbox::Sandbox;
use crate::workspace::WorkspaceStore;

use super::registry::TaskRegistry;
use super::webhook::{SessionData, WebhookPayload, WebhookSender};

/// Run one task end to end: sandbox + workspace + plan + agent loop, then
/// report the outcome by webhook. Always evicts the registry record after
/// the configured grace period, regardless of outcome.
pub async fn execute(task: TaskRequest, config: Arc<Config>, llm: Arc<dyn LlmClient>, registry: TaskRegistry, webhook: Option<Arc<WebhookSender>>) {
    let task_id = task.task_id.clone();
    info!(%task_id, "worker::execute: starting");

    registry.update(&task_id, |r| r.mark_running()).await;
    if let Some(sender) = &webhook {
        sender.send(&WebhookPayload::Running { task_id: task_id.clone() }).await;
    }

    let result = run_task(&task, &config, &llm).await;

    match result {
        Ok(outcome) => {
            registry.update(&task_id, |r| r.mark_completed()).await;
            if let Some(sender) = &webhook {
                let events: Vec<serde_json::Value> =
                    outcome.events.iter().map(|e| serde_json::to_value(e).unwrap_or(serde_json::Value::Null)).collect();
                sender
                    .send(&WebhookPayload::Completed {
                        task_id: task_id.clone(),
                        result_data: outcome.result_data,
                        result_files: outcome.result_files,
                        session_data: SessionData { iterations: outcome.iterations, events: events.clone() },
                        activity_log: events,
                    })
                    .await;
            }
        }
        Err(e) => {
            error!(%task_id, error = %e, "worker::execute: task failed");
            registry.update(&task_id, |r| r.mark_failed(e.to_string())).await;
            if let Some(sender) = &webhook {
                sender.send(&WebhookPayload::Failed { task_id: task_id.clone(), error_message: e.to_string() }).await;
            }
        }
    }

    registry.schedule_eviction(task_id, config.service.task_grace());
}

async fn run_task(task: &TaskRequest, config: &Config, llm: &Arc<dyn LlmClient>) -> Result<crate::r#loop::LoopOutcome, AppError> {
    let workspace_dir = config.service.workspace_root.join(format!("agent_workspace_{}", task.task_id));
    let workspace_dir_str = workspace_dir.to_string_lossy().into_owned();

    let workspace = WorkspaceStore::new(workspace_dir.clone());
    let sandbox = Sandbox::new(config.sandbox.clone(), &task.task_id)?;

    let planner = Planner::new(llm.clone(), ModelTier::Complex.resolve(&config.llm).to_string());
    let plan = planner.create_plan(&task.prompt).await?;

    let mut agent_loop = AgentLoop::new(llm.clone(), config.llm.clone(), config.agent_loop.clone(), sandbox, workspace);
    agent_loop.run(&task.task_id, &workspace_dir_str, plan).await
}

// `execute` drives real sandbox/LLM/webhook I/O end to end; it is exercised
// by the top-level HTTP integration tests instead of in isolation here.
