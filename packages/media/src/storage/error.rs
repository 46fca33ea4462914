use std::fmt;

/// Errors that can occur while writing objects to storage.
#[derive(Debug)]
pub enum StorageError {
    /// Required settings (bucket, credentials, root) are absent.
    NotConfigured(String),
    /// The configured bucket does not exist.
    BucketNotFound(String),
    /// The store rejected our credentials.
    AccessDenied(String),
    /// The object key is not a safe relative path.
    InvalidKey(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// Any other failure reported by the backend.
    Backend(String),
}

impl StorageError {
    /// Whether this failure points at deployment configuration rather than
    /// a transient backend problem.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_) | Self::BucketNotFound(_) | Self::AccessDenied(_)
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(what) => write!(f, "object storage not configured: {what}"),
            Self::BucketNotFound(bucket) => write!(f, "bucket not found: {bucket}"),
            Self::AccessDenied(detail) => write!(f, "access denied to bucket: {detail}"),
            Self::InvalidKey(key) => write!(f, "invalid object key: {key}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
