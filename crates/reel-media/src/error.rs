//! Media layer errors.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    // External tools
    #[error("ffmpeg is not installed or not on PATH")]
    FfmpegNotFound,

    #[error("ffprobe is not installed or not on PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        /// Last lines FFmpeg logged
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("operation timed out after {0}s")]
    Timeout(u64),

    // Sources and outputs
    #[error("source download failed: {message}")]
    DownloadFailed { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("refusing to overwrite {0}")]
    OutputExists(PathBuf),

    #[error("not a usable video: {0}")]
    InvalidVideo(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed ffprobe report: {0}")]
    JsonParse(#[from] serde_json::Error),

    // Clip primitives
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("time range [{start}, {end}] outside clip of {duration}s")]
    InvalidTimeRange { start: f64, end: f64, duration: f64 },

    #[error("no clip with handle {0}")]
    UnknownClip(u64),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal media error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// A required external tool is missing; retrying will not help.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::FfmpegNotFound | Self::FfprobeNotFound)
    }
}
