use async_trait::async_trait;

use super::error::StorageError;

/// Location of an object after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Publicly reachable URL of the object.
    pub url: String,
    /// Key the object was written under.
    pub key: String,
}

/// Durable, key-addressed object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key` with the given content type.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
}
