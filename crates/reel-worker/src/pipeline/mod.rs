//! Highlight render pipelines.

pub mod batch;
pub mod highlight;

pub use batch::{render_batch, BatchItem, BatchOptions, BatchReport, ItemSummary};
pub use highlight::{render_highlight, RenderJob, RenderOptions};
