//! Remote file store the sync engine reads and writes day files through.

mod github;

use async_trait::async_trait;

use crate::models::SyncSettings;
use crate::sync::SyncResult;

pub use github::{GitHubContentsClient, GITHUB_API_URL, GITHUB_USER_AGENT};

/// A remote file and the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    /// Opaque revision guard handed back on write (a blob sha on GitHub)
    pub revision: String,
}

/// Text files addressed by path, written with optimistic revision guards.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Read a file; `Ok(None)` when it does not exist.
    async fn fetch(&self, settings: &SyncSettings, path: &str) -> SyncResult<Option<RemoteFile>>;

    /// Create or replace a file. `revision` must be the one returned by the
    /// last fetch, or `None` when creating.
    async fn store(
        &self,
        settings: &SyncSettings,
        path: &str,
        content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> SyncResult<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::sync::SyncError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Commit {
        pub path: String,
        pub message: String,
        pub content: String,
    }

    /// In-memory remote that enforces revision guards like GitHub does.
    #[derive(Default)]
    pub struct MemoryRemote {
        files: Mutex<HashMap<String, (String, u64)>>,
        failing_writes: Mutex<HashSet<String>>,
        pub commits: Mutex<Vec<Commit>>,
        pub fetches: Mutex<Vec<String>>,
    }

    impl MemoryRemote {
        pub fn with_file(self, path: &str, content: &str) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), (content.to_string(), 1));
            self
        }

        pub fn fail_writes_to(&self, path: &str) {
            self.failing_writes.lock().unwrap().insert(path.to_string());
        }

        pub fn file(&self, path: &str) -> Option<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|(content, _)| content.clone())
        }

        pub fn commit_count(&self) -> usize {
            self.commits.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteFileStore for MemoryRemote {
        async fn fetch(
            &self,
            _settings: &SyncSettings,
            path: &str,
        ) -> SyncResult<Option<RemoteFile>> {
            self.fetches.lock().unwrap().push(path.to_string());
            Ok(self
                .files
                .lock()
                .unwrap()
                .get(path)
                .map(|(content, revision)| RemoteFile {
                    content: content.clone(),
                    revision: revision.to_string(),
                }))
        }

        async fn store(
            &self,
            _settings: &SyncSettings,
            path: &str,
            content: &str,
            message: &str,
            revision: Option<&str>,
        ) -> SyncResult<()> {
            if self.failing_writes.lock().unwrap().contains(path) {
                return Err(SyncError::Api {
                    status: 500,
                    message: "Server Error (500)".to_string(),
                });
            }
            let mut files = self.files.lock().unwrap();
            let current = files.get(path).map(|(_, revision)| revision.to_string());
            if current.as_deref() != revision {
                return Err(SyncError::Api {
                    status: 409,
                    message: format!("{path} does not match {}", revision.unwrap_or("")),
                });
            }
            let next = files.get(path).map_or(1, |(_, revision)| revision + 1);
            files.insert(path.to_string(), (content.to_string(), next));
            self.commits.lock().unwrap().push(Commit {
                path: path.to_string(),
                message: message.to_string(),
                content: content.to_string(),
            });
            Ok(())
        }
    }
}
