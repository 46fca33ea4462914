use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use media::{StorageConfig, UploadLimits};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any origin.
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL URL, or `memory:` for the in-process store.
    pub url: String,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Default: 10 MiB.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    /// Default: 100 MiB.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
    /// Parent directory for transcode scratch space. Default: OS temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Path or name of the ffmpeg binary. Default: "ffmpeg".
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

fn default_max_image_bytes() -> u64 {
    UploadLimits::default().max_image_bytes
}
fn default_max_video_bytes() -> u64 {
    UploadLimits::default().max_video_bytes
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
            temp_dir: None,
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl UploadConfig {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_image_bytes: self.max_image_bytes,
            max_video_bytes: self.max_video_bytes,
            temp_dir: self.temp_dir.clone(),
        }
    }

    /// Request body cap for the upload route: the largest per-kind limit plus
    /// room for multipart framing.
    pub fn body_limit(&self) -> usize {
        let largest = self.max_video_bytes.max(self.max_image_bytes);
        usize::try_from(largest + 1024 * 1024).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("database.url", "memory:")?
            .set_default("storage.backend", "s3")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SNAPGRAM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SNAPGRAM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
