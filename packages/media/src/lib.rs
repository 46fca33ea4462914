pub mod config;
pub mod media_type;
pub mod pipeline;
pub mod storage;
pub mod transcode;

pub use config::{StorageBackend, StorageConfig, UploadLimits};
pub use media_type::MediaType;
pub use pipeline::{IncomingFile, ProcessingError, UploadError, UploadPipeline, UploadedMedia};
