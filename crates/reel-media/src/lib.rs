//! Media layer for reel rendering.
//!
//! This crate provides:
//! - The [`MediaEngine`] clip-primitive boundary and [`OwnedClip`] guards
//! - An FFmpeg CLI engine and an in-memory engine for dry runs
//! - Type-safe FFmpeg command building with progress parsing
//! - Portrait geometry planning and the caption render stage
//! - Source acquisition (HLS remux, streamed HTTP download)

pub mod captions;
pub mod command;
pub mod download;
pub mod engine;
pub mod error;
pub mod ffmpeg_engine;
pub mod filters;
pub mod geometry;
pub mod memory;
pub mod probe;
pub mod progress;

pub use captions::{apply_captions, caption_window, format_caption_text, CaptionPass};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download::{acquire_source, classify_source, FetchOptions, SourceKind};
pub use engine::{ClipHandle, ClipInfo, MediaEngine, OwnedClip, TextClipSpec, TextLook};
pub use error::{MediaError, MediaResult};
pub use ffmpeg_engine::FfmpegEngine;
pub use geometry::{plan_transform, CropRect, TransformPlan};
pub use memory::{EncodedClip, FailurePlan, MemoryEngine};
pub use probe::{probe_video, VideoInfo};
pub use progress::{EncodeProgress, ProgressParser};
