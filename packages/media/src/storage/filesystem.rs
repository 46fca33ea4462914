use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use super::key::validate_key;
use super::traits::{ObjectStore, StoredObject};

/// Filesystem-backed object store for local development.
///
/// Objects live at `{base_path}/{key}`; URLs are `{public_base_url}/{key}`.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store, creating the root if needed.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        validate_key(key).map_err(|reason| StorageError::InvalidKey(format!("{key}: {reason}")))?;

        let object_path = self.base_path.join(key);
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(key, content_type, size = data.len(), "Stored object on filesystem");

        Ok(StoredObject {
            url: format!("{}/{key}", self.public_base_url),
            key: key.to_string(),
        })
    }
}
