//! Highlight models.

use serde::{Deserialize, Serialize};

use crate::error::{validate_range, ModelError, ModelResult};
use crate::interval::TimeRange;

/// A time range of interest in the source video, with a title.
///
/// Highlights are immutable once produced. Construction (including
/// deserialization) enforces `0 <= start < end`; the upper bound against the
/// source duration is only known once the source is opened and is checked by
/// the render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHighlight")]
pub struct Highlight {
    title: String,
    start: f64,
    end: f64,
}

/// Unvalidated wire form of a highlight.
#[derive(Debug, Deserialize)]
struct RawHighlight {
    #[serde(default)]
    title: String,
    start: f64,
    end: f64,
}

impl TryFrom<RawHighlight> for Highlight {
    type Error = ModelError;

    fn try_from(raw: RawHighlight) -> Result<Self, Self::Error> {
        Highlight::new(raw.title, raw.start, raw.end)
    }
}

impl Highlight {
    /// Create a new highlight, validating the time range.
    pub fn new(title: impl Into<String>, start: f64, end: f64) -> ModelResult<Self> {
        validate_range(start, end)?;
        Ok(Self {
            title: title.into(),
            start,
            end,
        })
    }

    /// Highlight title as produced by discovery or supplied by the caller.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Absolute start time in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Absolute end time in seconds.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Absolute window covered by this highlight.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}
