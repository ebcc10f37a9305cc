//! Dataset retrieval.
//!
//! Data sources never read files themselves. When a pass suspends on a
//! data source, the session asks a [`DatasetFetcher`] for the raw text and
//! feeds it back into the graph.

use crate::error::{Result, VisFlowError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

/// Source of raw dataset text, keyed by owner and file name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    async fn fetch(&self, username: &str, filename: &str) -> Result<String>;
}

/// Reads `<root>/<username>/<filename>` from disk.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a dataset path, refusing names that would leave the root.
    pub fn resolve(&self, username: &str, filename: &str) -> Result<PathBuf> {
        for part in [username, filename] {
            let path = Path::new(part);
            let plain = !part.is_empty()
                && path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(VisFlowError::Fetch(format!("invalid dataset path '{}'", part)));
            }
        }
        Ok(self.root.join(username).join(filename))
    }
}

#[async_trait]
impl DatasetFetcher for DirectoryFetcher {
    async fn fetch(&self, username: &str, filename: &str) -> Result<String> {
        let path = self.resolve(username, filename)?;
        tracing::debug!("Reading dataset {:?}", path);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| VisFlowError::Fetch(format!("failed to read {:?}: {}", path, e)))
    }
}

/// Serves datasets registered in memory.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: RwLock<HashMap<(String, String), String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, username: &str, filename: &str, text: impl Into<String>) -> Self {
        self.insert(username, filename, text);
        self
    }

    pub fn insert(&self, username: &str, filename: &str, text: impl Into<String>) {
        if let Ok(mut files) = self.files.write() {
            files.insert((username.to_string(), filename.to_string()), text.into());
        }
    }
}

#[async_trait]
impl DatasetFetcher for MemoryFetcher {
    async fn fetch(&self, username: &str, filename: &str) -> Result<String> {
        let files = self
            .files
            .read()
            .map_err(|_| VisFlowError::Fetch("dataset store poisoned".to_string()))?;
        files
            .get(&(username.to_string(), filename.to_string()))
            .cloned()
            .ok_or_else(|| {
                VisFlowError::Fetch(format!("no dataset '{}' for user '{}'", filename, username))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escapes() {
        let fetcher = DirectoryFetcher::new("/data");
        assert_eq!(
            fetcher.resolve("alice", "cars.csv").unwrap(),
            PathBuf::from("/data/alice/cars.csv")
        );
        assert!(fetcher.resolve("alice", "../bob/cars.csv").is_err());
        assert!(fetcher.resolve("", "cars.csv").is_err());
        assert!(fetcher.resolve("alice", "/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_directory_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("alice")).unwrap();
        std::fs::write(dir.path().join("alice/cars.csv"), "a,b\n1,2\n").unwrap();

        let fetcher = DirectoryFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("alice", "cars.csv").await.unwrap(), "a,b\n1,2\n");
        assert!(matches!(
            fetcher.fetch("alice", "missing.csv").await,
            Err(VisFlowError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_fetch() {
        let fetcher = MemoryFetcher::new().with_file("u", "f.csv", "x\n1\n");
        assert_eq!(fetcher.fetch("u", "f.csv").await.unwrap(), "x\n1\n");
        assert!(fetcher.fetch("v", "f.csv").await.is_err());
    }
}
