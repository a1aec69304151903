//! Structured batch logging utilities.
//!
//! Provides consistent, structured logging for render batches with
//! tracing spans and contextual information.

use std::path::Path;

use tracing::{error, info, warn, Span};

use crate::error::RenderError;

/// Batch logger for structured logging with consistent formatting.
///
/// Every message carries the batch ID and the operation (e.g. "render",
/// "process_indexed") so a batch can be followed in aggregated logs.
#[derive(Debug, Clone)]
pub struct BatchLogger {
    batch_id: String,
    operation: String,
}

impl BatchLogger {
    pub fn new(batch_id: impl Into<String>, operation: &str) -> Self {
        Self {
            batch_id: batch_id.into(),
            operation: operation.to_string(),
        }
    }

    /// Logger with a generated `<operation>-<timestamp>` batch ID.
    pub fn for_operation(operation: &str) -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        Self::new(format!("{}-{}", operation, stamp), operation)
    }

    /// Log the start of a batch.
    pub fn log_start(&self, source: &Path, highlights: usize) {
        info!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            source = %source.display(),
            highlights,
            "Batch started"
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            "Batch progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            "Batch warning: {}", message
        );
    }

    /// Log a rendered highlight.
    pub fn log_item_rendered(&self, index: usize, title: &str, path: &Path) {
        info!(
            batch_id = %self.batch_id,
            index,
            title = %title,
            path = %path.display(),
            "Highlight rendered"
        );
    }

    /// Log a highlight that was skipped because its render failed.
    pub fn log_item_failed(&self, index: usize, title: &str, err: &RenderError) {
        error!(
            batch_id = %self.batch_id,
            index,
            title = %title,
            stage = %err.stage(),
            error = %err,
            "Highlight failed, skipping"
        );
    }

    /// Log the end of a batch.
    pub fn log_completion(&self, produced: usize, attempted: usize) {
        info!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            produced,
            attempted,
            "Batch completed: {}/{} reels", produced, attempted
        );
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this batch.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "batch",
            batch_id = %self.batch_id,
            operation = %self.operation
        )
    }
}
