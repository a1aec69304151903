//! Worker error types.

use std::fmt;

use reel_media::MediaError;
use serde::Serialize;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Video intelligence request failed: {0}")]
    AiFailed(String),

    #[error("Video {video_id} not found in index {index_id}")]
    VideoNotFound { index_id: String, video_id: String },

    #[error("No highlights found: {0}")]
    NoHighlights(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Model error: {0}")]
    Model(#[from] reel_models::ModelError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Missing FFmpeg/ffprobe, as opposed to a failed run.
    pub fn is_tool_missing(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_tool_missing(),
            WorkerError::Render(e) => e.source.is_tool_missing(),
            _ => false,
        }
    }
}

/// Step of the single-highlight pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStage {
    Extract,
    Transform,
    Caption,
    Encode,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Extract => "extract",
            RenderStage::Transform => "transform",
            RenderStage::Caption => "caption",
            RenderStage::Encode => "encode",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one highlight render, tagged with the step that failed.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct RenderError {
    pub stage: RenderStage,
    #[source]
    pub source: MediaError,
}

impl RenderError {
    pub fn new(stage: RenderStage, source: MediaError) -> Self {
        Self { stage, source }
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }
}

/// Attach a stage to a media result.
pub(crate) trait StageExt<T> {
    fn at(self, stage: RenderStage) -> Result<T, RenderError>;
}

impl<T> StageExt<T> for Result<T, MediaError> {
    fn at(self, stage: RenderStage) -> Result<T, RenderError> {
        self.map_err(|e| RenderError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_reports_stage() {
        let err: Result<(), _> = Err(MediaError::unsupported("text")).at(RenderStage::Caption);
        let err = err.unwrap_err();
        assert_eq!(err.stage(), RenderStage::Caption);
        assert!(err.to_string().starts_with("caption stage failed"));
    }

    #[test]
    fn test_tool_missing_through_render_error() {
        let err = WorkerError::from(RenderError::new(RenderStage::Encode, MediaError::FfmpegNotFound));
        assert!(err.is_tool_missing());
        assert!(!WorkerError::ai_failed("boom").is_tool_missing());
    }
}
