//! Plan and Step types — the agent's todo.md pattern
//!
//! A [`Plan`] is an ordered, fixed sequence of [`Step`]s created once from the
//! task prompt. Steps are never reordered after creation; progress advances
//! forward only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category inferred from a step's description, used only to seed the
/// complexity heuristic in the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Research,
    Browser,
    Analysis,
    FileOperation,
    Code,
    General,
}

impl StepType {
    /// Infer a step's type from its description text by keyword match.
    ///
    /// Checked in a fixed order so that a description matching more than one
    /// keyword set is still classified deterministically.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        const RESEARCH: &[&str] = &["search", "find information"];
        const BROWSER: &[&str] = &["scrape", "browser", "navigate", "website"];
        const ANALYSIS: &[&str] = &["analyze", "process", "calculate"];
        const FILE_OP: &[&str] = &["write", "create file", "save", "generate"];
        const CODE: &[&str] = &["code", "script", "program"];

        if RESEARCH.iter().any(|k| lower.contains(k)) {
            StepType::Research
        } else if BROWSER.iter().any(|k| lower.contains(k)) {
            StepType::Browser
        } else if ANALYSIS.iter().any(|k| lower.contains(k)) {
            StepType::Analysis
        } else if FILE_OP.iter().any(|k| lower.contains(k)) {
            StepType::FileOperation
        } else if CODE.iter().any(|k| lower.contains(k)) {
            StepType::Code
        } else {
            StepType::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub description: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub status: StepStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub observation: Option<String>,
}

impl Step {
    pub fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        let step_type = StepType::infer(&description);
        Self {
            description,
            step_type,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            observation: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Done,
}

/// The planner's decomposition of a task into a fixed, ordered step sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub task_prompt: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub status: PlanStatus,
}

impl Plan {
    pub fn new(task_prompt: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            task_prompt: task_prompt.into(),
            steps,
            created_at: Utc::now(),
            status: PlanStatus::Active,
        }
    }

    /// The first pending step, if any — the step the agent should work on next.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == StepStatus::Pending)
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    pub fn mark_complete(&mut self, index: usize, observation: impl Into<String>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = StepStatus::Completed;
            step.completed_at = Some(Utc::now());
            step.observation = Some(observation.into());
        }
        if self.is_complete() {
            self.status = PlanStatus::Done;
        }
    }

    pub fn mark_failed(&mut self, index: usize, error: impl Into<String>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = StepStatus::Failed;
            step.completed_at = Some(Utc::now());
            step.observation = Some(format!("ERROR: {}", error.into()));
        }
    }

    /// Render the plan as a `todo.md`-style progress document.
    ///
    /// Idempotent: calling this twice without mutating the plan in between
    /// produces byte-identical output.
    pub fn render(&self) -> String {
        let mut out = format!("# Task: {}\n\n## Plan\n\n", self.task_prompt);
        out.push_str(&format!("Created: {}\n", self.created_at.to_rfc3339()));
        out.push_str(&format!(
            "Status: {}\n\n",
            match self.status {
                PlanStatus::Active => "active",
                PlanStatus::Done => "done",
            }
        ));

        for (i, step) in self.steps.iter().enumerate() {
            let icon = if step.status == StepStatus::Completed { "[x]" } else { "[ ]" };
            out.push_str(&format!("{}. {} {}\n", i + 1, icon, step.description));
            if let Some(obs) = &step.observation {
                let preview: String = obs.chars().take(200).collect();
                out.push_str(&format!("   → {}...\n", preview));
            }
        }

        out.push_str("\n## Progress\n\n");
        let completed = self.steps.iter().filter(|s| s.status == StepStatus::Completed).count();
        let total = self.steps.len();
        let pct = if total > 0 { completed as f64 / total as f64 * 100.0 } else { 0.0 };
        out.push_str(&format!("Completed: {}/{} ({:.1}%)\n", completed, total, pct));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        Plan::new(
            "Build a report",
            vec![
                Step::new("Search for competitor pricing"),
                Step::new("Write the final report"),
            ],
        )
    }

    #[test]
    fn test_step_type_inference() {
        assert_eq!(StepType::infer("Search for articles"), StepType::Research);
        assert_eq!(StepType::infer("Navigate to the website"), StepType::Browser);
        assert_eq!(StepType::infer("Analyze the dataset"), StepType::Analysis);
        assert_eq!(StepType::infer("Save the output file"), StepType::FileOperation);
        assert_eq!(StepType::infer("Write a script"), StepType::Code);
        assert_eq!(StepType::infer("Think about it"), StepType::General);
    }

    #[test]
    fn test_current_step_is_first_pending() {
        let mut plan = sample_plan();
        assert_eq!(plan.current_step().unwrap().description, "Search for competitor pricing");
        plan.mark_complete(0, "done searching");
        assert_eq!(plan.current_step().unwrap().description, "Write the final report");
    }

    #[test]
    fn test_plan_is_complete_iff_all_steps_completed() {
        let mut plan = sample_plan();
        assert!(!plan.is_complete());
        plan.mark_complete(0, "ok");
        assert!(!plan.is_complete());
        plan.mark_complete(1, "ok");
        assert!(plan.is_complete());
        assert_eq!(plan.status, PlanStatus::Done);
    }

    #[test]
    fn test_render_idempotent() {
        let plan = sample_plan();
        assert_eq!(plan.render(), plan.render());
    }

    #[test]
    fn test_render_reflects_progress() {
        let mut plan = sample_plan();
        plan.mark_complete(0, "found three competitors");
        let rendered = plan.render();
        assert!(rendered.contains("[x]"));
        assert!(rendered.contains("[ ]"));
        assert!(rendered.contains("Completed: 1/2"));
        assert!(rendered.contains("found three competitors"));
    }

    #[test]
    fn test_steps_never_reordered() {
        let plan = sample_plan();
        let descriptions: Vec<_> = plan.steps.iter().map(|s| s.description.clone()).collect();
        assert_eq!(descriptions, vec!["Search for competitor pricing", "Write the final report"]);
    }
}
