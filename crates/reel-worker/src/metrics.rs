//! Render metrics.
//!
//! Counters are emitted through the `metrics` facade; the embedding process
//! decides whether a recorder is installed.

use metrics::{counter, histogram};

use crate::error::RenderStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const RENDERS_TOTAL: &str = "reel_renders_total";
    pub const RENDER_FAILURES_TOTAL: &str = "reel_render_failures_total";
    pub const RENDER_DURATION_SECONDS: &str = "reel_render_duration_seconds";
    pub const BATCHES_TOTAL: &str = "reel_batches_total";
    pub const SOURCE_ACQUISITIONS_TOTAL: &str = "reel_source_acquisitions_total";
}

/// Record a rendered highlight.
pub fn record_render_success(duration_secs: f64) {
    counter!(names::RENDERS_TOTAL, "outcome" => "success").increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed highlight.
pub fn record_render_failure(stage: RenderStage) {
    counter!(names::RENDERS_TOTAL, "outcome" => "failure").increment(1);
    counter!(names::RENDER_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
}

/// Record a finished batch.
pub fn record_batch(produced: usize, attempted: usize) {
    let outcome = match (produced, attempted) {
        (_, 0) => "empty",
        (p, a) if p == a => "complete",
        (0, _) => "failed",
        _ => "partial",
    };
    counter!(names::BATCHES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a source acquisition by kind.
pub fn record_source_acquired(kind: &'static str) {
    counter!(names::SOURCE_ACQUISITIONS_TOTAL, "kind" => kind).increment(1);
}
