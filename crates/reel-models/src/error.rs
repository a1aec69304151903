//! Validation errors for model construction.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a model value violates its invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Time value must be finite, got start={start} end={end}")]
    NonFiniteTime { start: f64, end: f64 },

    #[error("Start time cannot be negative ({0}s)")]
    NegativeStart(f64),

    #[error("End time ({end}s) must be after start time ({start}s)")]
    EndNotAfterStart { start: f64, end: f64 },

    #[error("Unknown resize method: {0}")]
    UnknownResizeMethod(String),

    #[error("Unknown horizontal anchor: {0}")]
    UnknownAnchor(String),
}

/// Check the `0 <= start < end` invariant shared by highlights and captions.
pub(crate) fn validate_range(start: f64, end: f64) -> ModelResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(ModelError::NonFiniteTime { start, end });
    }
    if start < 0.0 {
        return Err(ModelError::NegativeStart(start));
    }
    if end <= start {
        return Err(ModelError::EndNotAfterStart { start, end });
    }
    Ok(())
}
