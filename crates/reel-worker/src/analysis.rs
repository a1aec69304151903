//! Highlight extraction from video-analysis text.
//!
//! The analysis service answers in free text. Highlights are picked out of
//! lines shaped like `**Title**: [12s ~ 45s]`, optionally with a human
//! readable time in parentheses next to each bound.

use std::sync::LazyLock;

use regex::Regex;
use reel_models::Highlight;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// Prompt sent when the caller does not provide one.
pub const DEFAULT_HIGHLIGHT_PROMPT: &str = "Create a detailed list of the top 5 most engaging and interesting moments in this video. For each moment, provide a clear title and specify the exact time range in the format [start_seconds~end_seconds]. Focus on moments that would make great short-form social media content of 15-60 seconds each.";

static HIGHLIGHT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.+?)\*\*:?\s*\[(\d+)s?\s*(?:\([^)]+\))?\s*~\s*(\d+)s?\s*(?:\([^)]+\))?\]").unwrap()
});

/// Extract highlights from analysis text, in order of appearance.
///
/// Matches whose range is not a valid highlight (e.g. `end <= start`) are
/// logged and skipped. No match yields an empty list.
pub fn parse_highlights(text: &str) -> Vec<Highlight> {
    HIGHLIGHT_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let title = caps[1].trim();
            let start: f64 = caps[2].parse().ok()?;
            let end: f64 = caps[3].parse().ok()?;

            match Highlight::new(title, start, end) {
                Ok(highlight) => Some(highlight),
                Err(e) => {
                    warn!(title = %title, start, end, error = %e, "Skipping invalid highlight");
                    None
                }
            }
        })
        .collect()
}

/// Read highlights from a file body: a JSON list of
/// `{title, start, end}` objects, or free analysis text.
///
/// Invalid JSON entries are skipped with a warning. Input that is neither
/// yields an empty list.
pub fn parse_highlights_input(body: &str) -> WorkerResult<Vec<Highlight>> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('[') {
        return Ok(parse_highlights(body));
    }

    let entries: Vec<serde_json::Value> = serde_json::from_str(trimmed)
        .map_err(|e| WorkerError::invalid_input(format!("highlights JSON: {}", e)))?;

    let highlights: Vec<Highlight> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<Highlight>(entry) {
            Ok(highlight) => Some(highlight),
            Err(e) => {
                warn!(entry = i, error = %e, "Skipping malformed highlight entry");
                None
            }
        })
        .collect();

    debug!(count = highlights.len(), "Parsed highlights from JSON");
    Ok(highlights)
}
