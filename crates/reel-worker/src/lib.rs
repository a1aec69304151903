//! Highlight-to-reel worker.
//!
//! This crate provides:
//! - Single-highlight and batch render pipelines over a media engine
//! - Highlight parsing from video-analysis text
//! - Caption track sourcing (transcript, file, highlight-title fallback)
//! - A TwelveLabs client and the end-to-end workflows built on it

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod transcript;
pub mod twelvelabs;
pub mod workflow;

pub use config::WorkerConfig;
pub use error::{RenderError, RenderStage, WorkerError, WorkerResult};
pub use logging::BatchLogger;
pub use pipeline::{render_batch, render_highlight, BatchOptions, BatchReport, RenderJob, RenderOptions};
pub use twelvelabs::{IndexSummary, TwelveLabsClient, VideoDetails, VideoIntelligence};
pub use workflow::{
    process_indexed_video, process_local, process_single, IndexedVideoRequest, LocalRequest,
    WorkflowContext, WorkflowReport,
};
