//! Task registry: the single process-wide point of insert/update/delete.
//!
//! All other per-task state (sandbox, event stream, workspace, plan) is
//! strictly task-local and lives on the worker's stack, never shared.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::TaskRecord;

#[derive(Debug, PartialEq, Eq)]
pub enum RegisterResult {
    Registered,
    Duplicate,
}

#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<String, TaskRecord>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Insert a new queued record unless a live record for this id already exists.
    pub async fn register(&self, task_id: &str) -> RegisterResult {
        let mut inner = self.inner.lock().await;
        if inner.get(task_id).is_some_and(TaskRecord::is_live) {
            debug!(%task_id, "TaskRegistry::register: rejected duplicate");
            return RegisterResult::Duplicate;
        }
        inner.insert(task_id.to_string(), TaskRecord::queued(task_id));
        RegisterResult::Registered
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.lock().await.get(task_id).cloned()
    }

    pub async fn update<F: FnOnce(&mut TaskRecord)>(&self, task_id: &str, f: F) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.get_mut(task_id) {
            f(record);
        }
    }

    /// Remove the record after `grace` has elapsed, regardless of its final status.
    pub fn schedule_eviction(&self, task_id: String, grace: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut inner = registry.inner.lock().await;
            inner.remove(&task_id);
            debug!(%task_id, "TaskRegistry::schedule_eviction: evicted");
        });
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
