//! System prompt rendering for the agent loop.
//!
//! A single embedded Handlebars template, rendered fresh each iteration with
//! the current plan, step, and recent events — there is no per-task or
//! per-user override chain, unlike the Rule-of-Five prompt library this
//! module's predecessor loaded from disk.

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

const SYSTEM_TEMPLATE: &str = include_str!("../../prompts/system.pmt");
const TEMPLATE_NAME: &str = "system";

#[derive(Debug, Serialize)]
pub struct PromptContext {
    pub task_prompt: String,
    pub progress_path: String,
    pub plan_render: String,
    pub current_step: String,
    pub recent_events: String,
    pub workspace_files: String,
    pub action_count: u32,
}

pub struct SystemPrompt {
    handlebars: Handlebars<'static>,
}

impl SystemPrompt {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string(TEMPLATE_NAME, SYSTEM_TEMPLATE).expect("embedded system prompt template is valid Handlebars");
        Self { handlebars }
    }

    pub fn render(&self, context: &PromptContext) -> String {
        debug!(task_prompt_len = context.task_prompt.len(), "SystemPrompt::render");
        self.handlebars.render(TEMPLATE_NAME, context).expect("system prompt context matches template fields")
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new()
    }
}
