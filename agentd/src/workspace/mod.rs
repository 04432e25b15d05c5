//! Workspace store: the per-task directory the agent reads and writes.
//!
//! Every path is resolved relative to a single root and rejected if it would
//! escape that root, so a task can never touch another task's files or the
//! host filesystem beyond its own workspace.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tokio::fs;
use tracing::debug;

use crate::error::WorkspaceError;

/// Scratch files the agent writes for its own bookkeeping are hidden from
/// listings intended for the model or the webhook's `result_files`.
const SCRATCH_PREFIX: &str = "_agent_";

pub struct WorkspaceStore {
    root: PathBuf,
}

impl WorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(?root, "WorkspaceStore::new");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the workspace directory exists.
    pub async fn init(&self) -> Result<(), WorkspaceError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        let candidate = Path::new(name);
        if candidate.is_absolute() || candidate.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(WorkspaceError::PathTraversal(name.to_string()));
        }
        Ok(self.root.join(candidate))
    }

    pub async fn save(&self, name: &str, content: &str) -> Result<(), WorkspaceError> {
        let path = self.resolve(name)?;
        debug!(%name, "WorkspaceStore::save");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<String, WorkspaceError> {
        let path = self.resolve(name)?;
        debug!(%name, "WorkspaceStore::read");
        fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::NotFound(name.to_string())
            } else {
                WorkspaceError::Io(e)
            }
        })
    }

    pub async fn delete(&self, name: &str) -> Result<(), WorkspaceError> {
        let path = self.resolve(name)?;
        debug!(%name, "WorkspaceStore::delete");
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::NotFound(name.to_string())
            } else {
                WorkspaceError::Io(e)
            }
        })
    }

    pub async fn exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let path = self.resolve(name)?;
        Ok(fs::metadata(&path).await.is_ok())
    }

    /// List file names directly under the workspace root, optionally
    /// filtered by a glob pattern. Scratch files are never returned.
    pub async fn list(&self, pattern: Option<&str>) -> Result<Vec<String>, WorkspaceError> {
        let glob = pattern.map(Pattern::new).transpose().map_err(|e| WorkspaceError::PathTraversal(e.to_string()))?;

        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(SCRATCH_PREFIX) {
                continue;
            }
            if glob.as_ref().is_some_and(|g| !g.matches(&name)) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Remove the workspace directory and everything under it.
    pub async fn cleanup(&self) -> Result<(), WorkspaceError> {
        debug!(root = ?self.root, "WorkspaceStore::cleanup");
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkspaceError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> WorkspaceStore {
        WorkspaceStore::new(dir.path())
    }

    #[tokio::test]
    async fn test_save_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        store.save("result.txt", "hello").await.unwrap();
        assert_eq!(store.read("result.txt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        assert!(matches!(store.read("missing.txt").await, Err(WorkspaceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        assert!(matches!(store.save("../escape.txt", "x").await, Err(WorkspaceError::PathTraversal(_))));
        assert!(matches!(store.read("/etc/passwd").await, Err(WorkspaceError::PathTraversal(_))));
    }

    #[tokio::test]
    async fn test_list_excludes_scratch_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        store.save("report.md", "x").await.unwrap();
        store.save("_agent_scratch.tmp", "x").await.unwrap();
        let files = store.list(None).await.unwrap();
        assert_eq!(files, vec!["report.md".to_string()]);
    }

    #[tokio::test]
    async fn test_list_with_glob_pattern() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        store.save("data.json", "{}").await.unwrap();
        store.save("notes.txt", "x").await.unwrap();
        let files = store.list(Some("*.json")).await.unwrap();
        assert_eq!(files, vec!["data.json".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        store.save("temp.txt", "x").await.unwrap();
        store.delete("temp.txt").await.unwrap();
        assert!(!store.exists("temp.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_removes_directory() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.init().await.unwrap();
        store.save("x.txt", "x").await.unwrap();
        store.cleanup().await.unwrap();
        assert!(!dir.path().join("x.txt").exists());
    }
}
