//! AgentLoop - executes the observe → plan → act → check cycle for one task.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{LlmConfig, LoopConfig};
use crate::domain::{Action, Event, EventStream, EventType, Plan, Step, StepType, is_error_observation};
use crate::error::AppError;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{PromptContext, SystemPrompt};
use crate::router;
use crate::sandbox::Sandbox;
use crate::workspace::WorkspaceStore;

const PROGRESS_DOC: &str = "todo.md";
const OBSERVATION_PREVIEW_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Idle,
    Running,
    Completed,
    MaxIterationsHit,
    Failed,
}

/// Result of driving a task's plan to a terminal state.
#[derive(Debug)]
pub struct LoopOutcome {
    pub status: LoopStatus,
    pub iterations: u32,
    pub result_files: Vec<String>,
    pub result_data: serde_json::Value,
    pub events: Vec<Event>,
    pub summary: Option<String>,
}

pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    llm_config: LlmConfig,
    loop_config: LoopConfig,
    sandbox: Sandbox,
    workspace: WorkspaceStore,
    events: EventStream,
    prompt: SystemPrompt,
    status: LoopStatus,
}

impl AgentLoop {
    pub fn new(llm: Arc<dyn LlmClient>, llm_config: LlmConfig, loop_config: LoopConfig, sandbox: Sandbox, workspace: WorkspaceStore) -> Self {
        Self {
            llm,
            llm_config,
            loop_config,
            sandbox,
            workspace,
            events: EventStream::with_default_capacity(),
            prompt: SystemPrompt::new(),
            status: LoopStatus::Idle,
        }
    }

    /// Drive `plan` to completion, an iteration cap, or a consecutive-error cap.
    ///
    /// Ensures the sandbox is stopped on every exit path.
    pub async fn run(&mut self, task_id: &str, workspace_dir: &str, mut plan: Plan) -> Result<LoopOutcome, AppError> {
        self.status = LoopStatus::Running;
        self.workspace.init().await?;
        self.sandbox.start(workspace_dir).await?;
        self.events.push(EventType::Task, format!("task {task_id} started"));
        self.persist_plan(&plan).await?;

        let outcome = self.drive(&mut plan).await;

        if let Err(e) = self.sandbox.stop().await {
            warn!(%task_id, error = %e, "AgentLoop::run: sandbox stop failed during cleanup");
        }

        outcome
    }

    async fn drive(&mut self, plan: &mut Plan) -> Result<LoopOutcome, AppError> {
        let mut consecutive_errors = 0u32;
        let mut iterations = 0u32;

        for _ in 0..self.loop_config.max_iterations {
            iterations += 1;

            let step = plan.current_step().cloned();
            let Some(step) = step else {
                self.status = LoopStatus::Completed;
                break;
            };
            let step_index = plan.current_step_index().unwrap();

            let complexity = self.complexity(step.step_type, consecutive_errors);
            let tier = router::select(&step_type_name(step.step_type), complexity);
            let model = tier.resolve(&self.llm_config).to_string();

            let action = match self.decide_action(plan, &step, &model, iterations).await {
                Ok(action) => action,
                Err(observation) => {
                    self.events.push(EventType::Action, "decide_action: failed to produce a tool call");
                    self.events.push(EventType::Observation, observation.clone());
                    consecutive_errors += 1;
                    if consecutive_errors >= self.loop_config.consecutive_error_cap {
                        self.status = LoopStatus::Failed;
                        return Err(AppError::ConsecutiveErrorCap);
                    }
                    let diagnosis = self.diagnose_recovery(&observation, &model).await;
                    self.events.push(EventType::Recovery, diagnosis);
                    continue;
                }
            };

            if let Action::Complete { summary, output_files } = &action {
                debug!(%summary, "AgentLoop::drive: complete action received");
                self.status = LoopStatus::Completed;
                plan.mark_complete(step_index, summary.clone());
                self.persist_plan(plan).await?;
                let result = self.extract_result(output_files).await?;
                return Ok(LoopOutcome {
                    status: self.status,
                    iterations,
                    result_files: result.0,
                    result_data: result.1,
                    events: self.events.all().into_iter().cloned().collect(),
                    summary: Some(summary.clone()),
                });
            }

            self.events.push(EventType::Action, format!("{action:?}"));
            let observation = self.dispatch(&action).await;
            self.events.push(EventType::Observation, observation.clone());
            // Progress advances only via the `complete` action (see AgentLoop::drive above);
            // no action→step matcher infers completion from an arbitrary observation.
            self.persist_plan(plan).await?;

            if is_error_observation(&observation) {
                consecutive_errors += 1;
                if consecutive_errors >= self.loop_config.consecutive_error_cap {
                    self.status = LoopStatus::Failed;
                    return Err(AppError::ConsecutiveErrorCap);
                }
                let diagnosis = self.diagnose_recovery(&observation, &model).await;
                self.events.push(EventType::Recovery, diagnosis);
            } else {
                consecutive_errors = 0;
            }

            if plan.is_complete() {
                self.status = LoopStatus::Completed;
                break;
            }
        }

        if self.status != LoopStatus::Completed {
            self.status = LoopStatus::MaxIterationsHit;
            return Err(AppError::MaxIterationsHit);
        }

        let result = self.extract_result(&[]).await?;
        Ok(LoopOutcome {
            status: self.status,
            iterations,
            result_files: result.0,
            result_data: result.1,
            events: self.events.all().into_iter().cloned().collect(),
            summary: None,
        })
    }

    /// Base 0.5, overridden by step type, plus a capped penalty for recent errors.
    fn complexity(&self, step_type: StepType, consecutive_errors: u32) -> f64 {
        let base = match step_type {
            StepType::Code | StepType::Analysis | StepType::Research => 0.8,
            StepType::Browser => 0.6,
            StepType::FileOperation => 0.3,
            StepType::General => 0.5,
        };
        let error_count = self.events.recent_error_count(self.loop_config.recent_events_window) as f64;
        let penalty = (0.1 * error_count.max(consecutive_errors as f64)).min(0.3);
        (base + penalty).min(1.0)
    }

    async fn decide_action(&self, plan: &Plan, step: &Step, model: &str, iteration: u32) -> Result<Action, String> {
        let recent: Vec<String> = self.events.recent(self.loop_config.recent_events_window).iter().map(|e| format!("[{}] {}", e.event_type, e.content)).collect();
        let workspace_files = self.workspace.list(None).await.unwrap_or_default();

        let system_prompt = self.prompt.render(&PromptContext {
            task_prompt: plan.task_prompt.clone(),
            progress_path: PROGRESS_DOC.to_string(),
            plan_render: plan.render(),
            current_step: step.description.clone(),
            recent_events: recent.join("\n"),
            workspace_files: if workspace_files.is_empty() { "(empty)".to_string() } else { workspace_files.join("\n") },
            action_count: iteration,
        });

        let request = CompletionRequest {
            system_prompt,
            messages: vec![Message::user("Choose the next tool call.")],
            tools: Action::tool_catalog(),
            max_tokens: 2048,
            model: Some(model.to_string()),
            temperature: None,
        };

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => return Err(format!("error: LLM completion failed: {e}")),
        };
        let Some(call) = response.tool_calls.first() else {
            return Ok(Action::Unknown { name: "(no tool call returned)".to_string() });
        };
        Action::from_tool_call(call).map_err(|e| format!("error: malformed tool call: {e}"))
    }

    async fn dispatch(&mut self, action: &Action) -> String {
        let result = match action {
            Action::SaveFile { filename, content } => self.workspace.save(filename, content).await.map(|_| "saved".to_string()).map_err(|e| e.to_string()),
            Action::ReadFile { filename } => self.workspace.read(filename).await.map_err(|e| e.to_string()),
            Action::Unknown { name } => return format!("Unrecognized tool '{name}'; no action taken."),
            _ => self.sandbox.dispatch(action).await.map_err(|e| e.to_string()),
        };

        match result {
            Ok(text) => text,
            Err(message) => format!("error: {message}"),
        }
    }

    async fn diagnose_recovery(&self, observation: &str, model: &str) -> String {
        let request = CompletionRequest {
            system_prompt: "An action in an autonomous agent loop failed. Diagnose the likely cause in one or two sentences.".to_string(),
            messages: vec![Message::user(observation.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())],
            tools: vec![],
            max_tokens: 256,
            model: Some(model.to_string()),
            temperature: None,
        };
        match self.llm.complete(request).await {
            Ok(response) => response.content.unwrap_or_else(|| "no diagnosis returned".to_string()),
            Err(e) => format!("recovery diagnosis failed: {e}"),
        }
    }

    async fn persist_plan(&self, plan: &Plan) -> Result<(), AppError> {
        self.workspace.save(PROGRESS_DOC, &plan.render()).await?;
        Ok(())
    }

    async fn extract_result(&self, explicit_output_files: &[String]) -> Result<(Vec<String>, serde_json::Value), AppError> {
        let files = self.workspace.list(None).await?;
        let mut result_data = serde_json::Map::new();

        for name in &files {
            if name.ends_with(".json") || name.ends_with(".md") || name.ends_with(".txt") || name.ends_with(".csv") {
                if let Ok(content) = self.workspace.read(name).await {
                    result_data.insert(name.clone(), serde_json::Value::String(content));
                }
            }
        }

        let mut result_files = files;
        for name in explicit_output_files {
            if !result_files.contains(name) {
                result_files.push(name.clone());
            }
        }

        Ok((result_files, serde_json::Value::Object(result_data)))
    }
}

fn step_type_name(step_type: StepType) -> String {
    match step_type {
        StepType::Research => "research",
        StepType::Browser => "browser",
        StepType::Analysis => "analysis",
        StepType::FileOperation => "file_operation",
        StepType::Code => "code",
        StepType::General => "general",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_name_matches_router_vocabulary() {
        assert_eq!(step_type_name(StepType::Code), "code");
        assert_eq!(step_type_name(StepType::FileOperation), "file_operation");
    }

}
