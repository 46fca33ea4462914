use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Output settings for web playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    pub container: String,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub fps: u32,
    /// x264 constant rate factor; 18 is visually lossless, 28 is still good.
    pub crf: u8,
    /// Move the moov atom to the front so playback can start before download ends.
    pub faststart: bool,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self::web()
    }
}

impl TranscodeProfile {
    /// H.264/AAC MP4 capped at 720p30, 1000 kbps video and 128 kbps audio.
    pub fn web() -> Self {
        Self {
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            container: "mp4".into(),
            video_bitrate_kbps: 1000,
            audio_bitrate_kbps: 128,
            max_width: 1280,
            max_height: 720,
            fps: 30,
            crf: 23,
            faststart: true,
        }
    }

    /// Scale down (never up) to fit the bounding box, keeping even dimensions.
    fn scale_filter(&self) -> String {
        format!(
            "scale='min({w},iw)':'min({h},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
            w = self.max_width,
            h = self.max_height,
        )
    }

    /// ffmpeg argument list for this profile.
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c:v".into(),
            self.video_codec.clone().into(),
            "-preset".into(),
            "fast".into(),
            "-crf".into(),
            self.crf.to_string().into(),
            "-b:v".into(),
            format!("{}k", self.video_bitrate_kbps).into(),
            "-maxrate".into(),
            format!("{}k", self.video_bitrate_kbps).into(),
            "-bufsize".into(),
            format!("{}k", self.video_bitrate_kbps * 2).into(),
            "-vf".into(),
            self.scale_filter().into(),
            "-r".into(),
            self.fps.to_string().into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            self.audio_codec.clone().into(),
            "-b:a".into(),
            format!("{}k", self.audio_bitrate_kbps).into(),
        ];
        if self.faststart {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args.push("-f".into());
        args.push(self.container.clone().into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("transcoder produced no output at {0}")]
    MissingOutput(PathBuf),
}

/// Converts a video file on disk into another file according to a profile.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), TranscodeError>;
}

/// Transcoder backed by an external `ffmpeg` binary.
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Keep the tail of stderr; ffmpeg prints the actual error last.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(10);
    lines[start..].join("\n")
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), TranscodeError> {
        let args = profile.ffmpeg_args(input, output);
        debug!(binary = %self.binary.display(), ?args, "Starting ffmpeg");
        let started = Instant::now();

        let result = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !result.status.success() {
            let stderr = stderr_tail(&result.stderr);
            warn!(status = ?result.status.code(), %stderr, "ffmpeg failed");
            return Err(TranscodeError::Failed {
                status: result.status.code(),
                stderr,
            });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg transcode finished"
        );
        Ok(())
    }
}
