use std::path::PathBuf;

use serde::Deserialize;

const MIB: u64 = 1024 * 1024;

/// Which object store implementation backs uploads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Filesystem,
}

/// Object storage configuration.
///
/// Every credential field is optional so the server can start without them;
/// uploads then fail closed with a configuration error.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    /// AWS region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base URL prepended to object keys in returned media URLs.
    pub public_base_url: Option<String>,
    /// Root directory for the filesystem backend.
    pub root: Option<PathBuf>,
}

fn default_region() -> String {
    "us-east-1".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: None,
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
            root: None,
        }
    }
}

/// Per-kind upload caps plus scratch space for transcoding.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadLimits {
    /// Default: 10 MiB.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    /// Default: 100 MiB.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
    /// Parent directory for transcode scratch files. Default: OS temp dir.
    pub temp_dir: Option<PathBuf>,
}

fn default_max_image_bytes() -> u64 {
    10 * MIB
}
fn default_max_video_bytes() -> u64 {
    100 * MIB
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
            temp_dir: None,
        }
    }
}

impl StorageConfig {
    /// Directory the filesystem backend writes to. Default: "./data/media".
    pub fn filesystem_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| PathBuf::from("./data/media"))
    }

    /// Returns the names of the settings the S3 backend still needs.
    pub fn missing_s3_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.bucket) {
            missing.push("bucket");
        }
        if is_blank(&self.access_key_id) {
            missing.push("access_key_id");
        }
        if is_blank(&self.secret_access_key) {
            missing.push("secret_access_key");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
