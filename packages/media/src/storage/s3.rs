use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, warn};

use super::error::StorageError;
use super::traits::{ObjectStore, StoredObject};
use crate::config::StorageConfig;

/// S3 (or S3-compatible) object store.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Build a store from configuration without touching the network.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let missing = config.missing_s3_settings();
        if !missing.is_empty() {
            return Err(StorageError::NotConfigured(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        // Checked above.
        let bucket_name = config.bucket.clone().unwrap_or_default();
        let region_name = if config.region.trim().is_empty() {
            "us-east-1".to_string()
        } else {
            config.region.trim().to_string()
        };

        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty());

        let region = Region::Custom {
            region: region_name.clone(),
            endpoint: endpoint
                .clone()
                .unwrap_or_else(|| format!("https://s3.{region_name}.amazonaws.com")),
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::NotConfigured(format!("invalid credentials: {e}")))?;

        let bucket = Bucket::new(&bucket_name, region, credentials)
            .map_err(|e| StorageError::NotConfigured(format!("invalid bucket settings: {e}")))?;

        // Custom endpoints (MinIO and friends) rarely support virtual-host addressing.
        let bucket = if endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        let public_base_url = match (&config.public_base_url, &endpoint) {
            (Some(base), _) if !base.trim().is_empty() => base.trim_end_matches('/').to_string(),
            (_, Some(endpoint)) => format!("{endpoint}/{bucket_name}"),
            _ => format!("https://{bucket_name}.s3.{region_name}.amazonaws.com"),
        };

        Ok(Self {
            bucket,
            bucket_name,
            public_base_url,
        })
    }
}

/// Map a non-success S3 response onto a storage error.
fn classify_failure(bucket: &str, status: u16, body: &str) -> StorageError {
    if body.contains("NoSuchBucket") {
        return StorageError::BucketNotFound(bucket.to_string());
    }
    if status == 403 || body.contains("AccessDenied") {
        return StorageError::AccessDenied(bucket.to_string());
    }
    StorageError::Backend(format!("S3 responded with status {status}: {}", body.trim()))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        debug!(bucket = %self.bucket_name, key, content_type, size = data.len(), "Uploading object to S3");

        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| {
                let detail = e.to_string();
                warn!(bucket = %self.bucket_name, key, error = %detail, "S3 upload failed");
                classify_failure(&self.bucket_name, 0, &detail)
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            let body = String::from_utf8_lossy(response.bytes()).to_string();
            warn!(bucket = %self.bucket_name, key, status, "S3 upload rejected");
            return Err(classify_failure(&self.bucket_name, status, &body));
        }

        Ok(StoredObject {
            url: format!("{}/{key}", self.public_base_url),
            key: key.to_string(),
        })
    }
}
