//! Temporal interval utilities.
//!
//! Pure functions used to associate caption segments with highlight windows:
//! overlap testing, rebasing from absolute source time into clip-relative
//! time, and clamping into a window.

use crate::caption::CaptionSegment;

/// Shortest caption duration (seconds) worth rendering.
pub const MIN_VISIBLE_DURATION: f64 = 0.1;

/// A half-open time window `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Half-open overlap test: `a.end > b.start && a.start < b.end`.
pub fn overlaps(a: TimeRange, b: TimeRange) -> bool {
    a.end > b.start && a.start < b.end
}

/// Translate a segment so that `origin` becomes time zero.
pub fn rebase(segment: &CaptionSegment, origin: f64) -> CaptionSegment {
    CaptionSegment {
        text: segment.text.clone(),
        start: segment.start - origin,
        end: segment.end - origin,
    }
}

/// Intersect a segment with `window`.
///
/// Returns `None` when nothing, or less than [`MIN_VISIBLE_DURATION`], remains.
pub fn clamp(segment: &CaptionSegment, window: TimeRange) -> Option<CaptionSegment> {
    let start = segment.start.max(window.start);
    let end = segment.end.min(window.end);
    let duration = end - start;

    if duration <= 0.0 || duration < MIN_VISIBLE_DURATION {
        return None;
    }

    Some(CaptionSegment {
        text: segment.text.clone(),
        start,
        end,
    })
}

/// Select the captions of an absolute-time track that fall inside `window`,
/// rebased to the window start and clamped to `[0, window.duration()]`.
///
/// Track order is preserved.
pub fn captions_for_window(track: &[CaptionSegment], window: TimeRange) -> Vec<CaptionSegment> {
    let relative = TimeRange::new(0.0, window.duration());

    track
        .iter()
        .filter(|segment| overlaps(segment.range(), window))
        .filter_map(|segment| clamp(&rebase(segment, window.start), relative))
        .collect()
}
