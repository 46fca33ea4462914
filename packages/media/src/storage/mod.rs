mod error;
mod traits;

pub mod filesystem;
pub mod key;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

use tracing::{info, warn};

pub use error::StorageError;
pub use traits::{ObjectStore, StoredObject};

use crate::config::{StorageBackend, StorageConfig};

/// Build the configured object store.
///
/// Returns `Ok(None)` when the S3 backend lacks a bucket or credentials, so
/// the server can still start and reject uploads with a configuration error.
pub async fn build_object_store(
    config: &StorageConfig,
) -> Result<Option<Arc<dyn ObjectStore>>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let root = config.filesystem_root();
            let base_url = config
                .public_base_url
                .clone()
                .unwrap_or_else(|| "/media".to_string());
            info!(root = %root.display(), "Using filesystem object store");
            let store = filesystem::FilesystemObjectStore::new(root, base_url).await?;
            Ok(Some(Arc::new(store)))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => match self::s3::S3ObjectStore::from_config(config) {
            Ok(store) => {
                info!(bucket = ?config.bucket, region = %config.region, "Using S3 object store");
                Ok(Some(Arc::new(store)))
            }
            Err(StorageError::NotConfigured(detail)) => {
                warn!("S3 object store not configured ({detail}); uploads will be rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        },
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => {
            warn!("S3 backend selected but object-storage support is not compiled in");
            Ok(None)
        }
    }
}
