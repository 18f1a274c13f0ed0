use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::DocumentStore;
use crate::error::Result;

/// Filesystem-backed document store rooted at a directory. Document paths
/// are slash-separated and resolved relative to the root.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn exists(&self, path: &str) -> bool {
        fs::metadata(self.resolve(path)).await.is_ok()
    }

    async fn read(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.resolve(path)).await?)
    }

    async fn write(&self, path: &str, text: &str) -> Result<()> {
        let target = self.resolve(path);

        // Atomic write: tmp file in the same directory, then rename.
        let tmp = match target.parent() {
            Some(parent) => parent.join(format!(".stoker-{}.tmp", Uuid::new_v4())),
            None => PathBuf::from(format!(".stoker-{}.tmp", Uuid::new_v4())),
        };
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, &target).await?;

        Ok(())
    }

    async fn create_containing(&self, path: &str) -> Result<()> {
        if let Some(parent) = self.resolve(path).parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
