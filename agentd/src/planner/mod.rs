//! Planner: turns a task prompt into a [`Plan`] via a single LLM completion.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Plan, Step};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};

const PLAN_SYSTEM_PROMPT: &str = "You break a task down into a numbered list of concrete steps. \
Reply with ONLY the numbered list, one step per line, formatted as '1. ...', '2. ...', etc. \
Keep each step to a single sentence.";

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    high_capability_model: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, high_capability_model: impl Into<String>) -> Self {
        Self { llm, high_capability_model: high_capability_model.into() }
    }

    /// Send a single completion request asking for a numbered plan, then
    /// parse it into a fixed, ordered step sequence.
    pub async fn create_plan(&self, task_prompt: &str) -> Result<Plan, LlmError> {
        debug!(%task_prompt, "Planner::create_plan");

        let request = CompletionRequest {
            system_prompt: PLAN_SYSTEM_PROMPT.to_string(),
            messages: vec![Message::user(task_prompt.to_string())],
            tools: vec![],
            max_tokens: 1024,
            model: Some(self.high_capability_model.clone()),
            temperature: None,
        };

        let response = self.llm.complete(request).await?;
        let text = response.content.unwrap_or_default();
        let steps = parse_numbered_steps(&text);

        let steps = if steps.is_empty() { vec![Step::new(task_prompt.to_string())] } else { steps };

        Ok(Plan::new(task_prompt.to_string(), steps))
    }
}

/// Scan for lines beginning with a digit followed by `.` or `)`; the
/// remainder of the line becomes the step text.
fn parse_numbered_steps(text: &str) -> Vec<Step> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let mut chars = trimmed.char_indices();
            let (_, first) = chars.next()?;
            if !first.is_ascii_digit() {
                return None;
            }
            let digit_end = trimmed.find(|c: char| !c.is_ascii_digit())?;
            let rest = &trimmed[digit_end..];
            let marker = rest.chars().next()?;
            if marker != '.' && marker != ')' {
                return None;
            }
            let description = rest[marker.len_utf8()..].trim();
            if description.is_empty() {
                None
            } else {
                Some(Step::new(description.to_string()))
            }
        })
        .collect()
}
