//! Shared data models for the reel rendering pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Highlights and caption segments (validated on construction)
//! - Temporal interval math used to associate captions with highlights
//! - Resize methods, caption styling and encoding profiles
//! - Output filename derivation

pub mod caption;
pub mod encoding;
pub mod error;
pub mod highlight;
pub mod interval;
pub mod naming;
pub mod style;

// Re-export common types
pub use caption::{CaptionSegment, CaptionStyle, HorizontalAnchor};
pub use encoding::EncodingProfile;
pub use error::{ModelError, ModelResult};
pub use highlight::Highlight;
pub use interval::{captions_for_window, TimeRange, MIN_VISIBLE_DURATION};
pub use naming::{adhoc_output_filename, batch_output_filename, slug_title};
pub use style::{AspectRatio, ResizeMethod, PORTRAIT_HEIGHT, PORTRAIT_WIDTH};
