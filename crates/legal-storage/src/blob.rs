// Filesystem-backed BlobStore for uploaded contracts and generated
// documents. Production deployments behind object storage (S3-compatible)
// can swap this out for another `BlobStore` impl without touching the
// orchestrator; nothing upstream depends on the `file://` scheme.

use async_trait::async_trait;
use legal_core::{BlobStore, OrchestratorError, Result};
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(OrchestratorError::invalid_request("invalid blob key"));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| OrchestratorError::Internal(e.into()))?;
        }
        fs::write(&path, bytes).await.map_err(|e| OrchestratorError::Internal(e.into()))?;
        Ok(format!("file://{}", path.display()))
    }

    async fn get(&self, uri: &str) -> Result<Vec<u8>> {
        let path = uri
            .strip_prefix("file://")
            .ok_or_else(|| OrchestratorError::invalid_request("unsupported blob uri scheme"))?;
        fs::read(path).await.map_err(|_| OrchestratorError::invalid_request("blob not found"))
    }
}
