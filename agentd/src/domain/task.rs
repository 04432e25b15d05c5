//! Task request/record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Priority;

/// Boundary input: a task submitted over HTTP for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub priority: Priority,
    pub user_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Lifecycle status of a task record in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// In-memory record of a task's lifecycle, keyed by `task_id` in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn queued(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Queued,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
    }

    pub fn mark_completed(&mut self) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    pub fn is_live(&self) -> bool {
        matches!(self.status, TaskStatus::Queued | TaskStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_record_lifecycle() {
        let mut record = TaskRecord::queued("T-1");
        assert!(record.is_live());

        record.mark_running();
        assert_eq!(record.status, TaskStatus::Running);
        assert!(record.is_live());

        record.mark_completed();
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(!record.is_live());
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_task_record_failure_captures_error() {
        let mut record = TaskRecord::queued("T-2");
        record.mark_failed("sandbox unavailable");
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("sandbox unavailable"));
    }

    #[test]
    fn test_task_request_deserialize_defaults() {
        let json = r#"{"task_id":"T-1","title":"x","prompt":"do it","user_id":"U-1"}"#;
        let req: TaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.priority, Priority::Normal);
        assert!(req.description.is_none());
        assert!(req.project_id.is_none());
    }
}
