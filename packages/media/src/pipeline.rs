use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::UploadLimits;
use crate::media_type::MediaType;
use crate::storage::key::{image_key, video_key};
use crate::storage::{ObjectStore, StorageError};
use crate::transcode::{TranscodeError, TranscodeProfile, Transcoder};

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];
const ALLOWED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
];

/// A single file received from a client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    /// MIME type declared by the client.
    pub content_type: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where an ingested file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub media_url: String,
    pub storage_key: String,
    pub media_type: MediaType,
}

/// Failure while storing or transcoding an accepted file.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("object upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error("scratch file handling failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{kind} of {actual} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        kind: MediaType,
        actual: u64,
        limit: u64,
    },

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("object storage misconfigured: {0}")]
    Configuration(String),

    #[error("media processing failed: {0}")]
    Processing(#[source] ProcessingError),
}

impl From<ProcessingError> for UploadError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Storage(storage) if storage.is_configuration() => {
                UploadError::Configuration(storage.to_string())
            }
            other => UploadError::Processing(other),
        }
    }
}

/// Validates uploads and moves them into object storage, transcoding video on the way.
pub struct UploadPipeline {
    store: Option<Arc<dyn ObjectStore>>,
    transcoder: Arc<dyn Transcoder>,
    limits: UploadLimits,
    profile: TranscodeProfile,
}

impl UploadPipeline {
    /// `store` is `None` when object storage is not configured; such a
    /// pipeline still validates input but refuses to store anything.
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        transcoder: Arc<dyn Transcoder>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            store,
            transcoder,
            limits,
            profile: TranscodeProfile::web(),
        }
    }

    pub fn with_profile(mut self, profile: TranscodeProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Run validation, then store the file (transcoding video first).
    ///
    /// Validation is fail-fast in this order: presence, size, type, storage
    /// configuration. Nothing touches the network or disk before all four pass.
    #[instrument(skip_all, fields(name, content_type, size))]
    pub async fn ingest(&self, file: Option<IncomingFile>) -> Result<UploadedMedia, UploadError> {
        let file = file.ok_or_else(|| UploadError::InvalidRequest("No file uploaded".into()))?;

        let span = tracing::Span::current();
        span.record("name", file.original_name.as_str());
        span.record("content_type", file.content_type.as_str());
        span.record("size", file.len());

        let content_type = file.content_type.trim().to_ascii_lowercase();
        let kind = MediaType::from_mime(&content_type);

        let limit = match kind {
            MediaType::Image => self.limits.max_image_bytes,
            MediaType::Video => self.limits.max_video_bytes,
        };
        if file.len() > limit {
            return Err(UploadError::PayloadTooLarge {
                kind,
                actual: file.len(),
                limit,
            });
        }

        let allowed = match kind {
            MediaType::Image => ALLOWED_IMAGE_TYPES,
            MediaType::Video => ALLOWED_VIDEO_TYPES,
        };
        if !allowed.contains(&content_type.as_str()) {
            return Err(UploadError::UnsupportedMediaType(file.content_type));
        }

        let store = self.store.as_deref().ok_or_else(|| {
            UploadError::Configuration("object storage credentials or bucket are not set".into())
        })?;

        let uploaded = match kind {
            MediaType::Image => self.store_image(store, file, &content_type).await?,
            MediaType::Video => self.store_video(store, file).await?,
        };

        info!(key = %uploaded.storage_key, media_type = %uploaded.media_type, "Upload stored");
        Ok(uploaded)
    }

    async fn store_image(
        &self,
        store: &dyn ObjectStore,
        file: IncomingFile,
        content_type: &str,
    ) -> Result<UploadedMedia, ProcessingError> {
        let key = image_key(&file.original_name, Utc::now().timestamp_millis());
        let stored = store.put(&key, file.data, content_type).await?;
        Ok(UploadedMedia {
            media_url: stored.url,
            storage_key: stored.key,
            media_type: MediaType::Image,
        })
    }

    async fn store_video(
        &self,
        store: &dyn ObjectStore,
        file: IncomingFile,
    ) -> Result<UploadedMedia, ProcessingError> {
        let scratch = self.scratch_dir()?;
        let result = self.transcode_and_store(store, scratch.path(), file).await;
        release_scratch(scratch).await;
        result
    }

    async fn transcode_and_store(
        &self,
        store: &dyn ObjectStore,
        scratch: &Path,
        file: IncomingFile,
    ) -> Result<UploadedMedia, ProcessingError> {
        let input = scratch.join("input");
        let output = scratch.join("output.mp4");

        tokio::fs::write(&input, &file.data).await?;
        drop(file);

        debug!(input = %input.display(), "Transcoding video");
        self.transcoder
            .transcode(&input, &output, &self.profile)
            .await?;

        let transcoded = tokio::fs::read(&output).await?;
        let key = video_key(Utc::now().timestamp_millis());
        let stored = store.put(&key, transcoded, "video/mp4").await?;

        Ok(UploadedMedia {
            media_url: stored.url,
            storage_key: stored.key,
            media_type: MediaType::Video,
        })
    }

    fn scratch_dir(&self) -> Result<TempDir, std::io::Error> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("snapgram-transcode-");
        match &self.limits.temp_dir {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Remove a scratch directory and everything in it, logging instead of
/// failing so the caller's own result is never replaced.
async fn release_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    match tokio::task::spawn_blocking(move || scratch.close()).await {
        Ok(Ok(())) => debug!(path = %path.display(), "Removed transcode scratch directory"),
        Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Failed to remove transcode scratch directory"),
        Err(e) => warn!(path = %path.display(), error = %e, "Scratch cleanup task panicked"),
    }
}
