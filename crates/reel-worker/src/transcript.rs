//! Caption track sourcing.
//!
//! Caption tracks are ordered `{text, start, end}` segments in absolute
//! source time. They come from the transcription service, from a JSON file,
//! or are synthesized from the highlights when neither has anything.

use std::path::Path;

use reel_models::{CaptionSegment, Highlight};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};

/// Longest synthesized caption, seconds.
pub const FALLBACK_CAPTION_SECS: f64 = 5.0;

/// Wire shape of a transcript entry. The transcription API calls the text
/// field `value`.
#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(default, alias = "value")]
    text: String,
    start: f64,
    end: f64,
}

/// Convert raw transcript entries into caption segments, in order.
///
/// Entries that are malformed or violate `0 <= start < end` are skipped.
pub fn parse_caption_entries(entries: Vec<serde_json::Value>) -> Vec<CaptionSegment> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let entry: TranscriptEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(entry = i, error = %e, "Skipping malformed caption entry");
                    return None;
                }
            };
            match CaptionSegment::new(entry.text, entry.start, entry.end) {
                Ok(segment) => Some(segment),
                Err(e) => {
                    warn!(entry = i, error = %e, "Skipping invalid caption entry");
                    None
                }
            }
        })
        .collect()
}

/// Load a caption track from a JSON file holding a list of segments.
pub async fn load_caption_track(path: &Path) -> WorkerResult<Vec<CaptionSegment>> {
    let body = tokio::fs::read_to_string(path).await?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
        WorkerError::invalid_input(format!("caption file {}: {}", path.display(), e))
    })?;

    let total = entries.len();
    let track = parse_caption_entries(entries);
    info!(path = %path.display(), loaded = track.len(), total, "Loaded caption track");
    Ok(track)
}

/// One caption per highlight: its title, shown from the highlight start for
/// up to [`FALLBACK_CAPTION_SECS`].
pub fn fallback_captions(highlights: &[Highlight]) -> Vec<CaptionSegment> {
    highlights
        .iter()
        .map(|h| CaptionSegment {
            text: h.title().to_string(),
            start: h.start(),
            end: h.start() + h.duration().min(FALLBACK_CAPTION_SECS),
        })
        .collect()
}

/// Track to render with: empty when captions are disabled, the fetched
/// track when it has segments, synthesized captions otherwise.
pub fn resolve_caption_track(
    fetched: Vec<CaptionSegment>,
    highlights: &[Highlight],
    add_captions: bool,
) -> Vec<CaptionSegment> {
    if !add_captions {
        return Vec::new();
    }
    if !fetched.is_empty() {
        return fetched;
    }

    let synthesized = fallback_captions(highlights);
    info!(count = synthesized.len(), "No transcript available, captioning highlight titles");
    synthesized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlights() -> Vec<Highlight> {
        vec![
            Highlight::new("Intro", 0.0, 15.0).unwrap(),
            Highlight::new("Quick", 50.0, 52.0).unwrap(),
        ]
    }

    #[test]
    fn test_fallback_caps_at_five_seconds() {
        let captions = fallback_captions(&highlights());
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].text, "Intro");
        assert_eq!((captions[0].start, captions[0].end), (0.0, 5.0));
        assert_eq!((captions[1].start, captions[1].end), (50.0, 52.0));
    }

    #[test]
    fn test_resolve_prefers_fetched_track() {
        let fetched = vec![CaptionSegment::new("hi", 2.0, 4.0).unwrap()];
        let track = resolve_caption_track(fetched.clone(), &highlights(), true);
        assert_eq!(track, fetched);

        let track = resolve_caption_track(Vec::new(), &highlights(), true);
        assert_eq!(track.len(), 2);

        assert!(resolve_caption_track(fetched, &highlights(), false).is_empty());
    }

    #[test]
    fn test_parse_entries_accepts_value_field_and_skips_bad() {
        let entries = serde_json::json!([
            {"value": "hello there", "start": 1.0, "end": 2.5},
            {"text": "backwards", "start": 5.0, "end": 4.0},
            {"text": "no times"},
            {"text": "ok", "start": 6, "end": 7}
        ]);
        let serde_json::Value::Array(entries) = entries else {
            unreachable!()
        };

        let track = parse_caption_entries(entries);
        assert_eq!(track.len(), 2);
        assert_eq!(track[0].text, "hello there");
        assert_eq!(track[1].text, "ok");
        assert_eq!(track[1].start, 6.0);
    }

    #[tokio::test]
    async fn test_load_caption_track_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json");
        std::fs::write(&path, r#"[{"text": "hi", "start": 2, "end": 4}, {"start": 1}]"#).unwrap();

        let track = load_caption_track(&path).await.unwrap();
        assert_eq!(track, vec![CaptionSegment::new("hi", 2.0, 4.0).unwrap()]);
    }

    #[tokio::test]
    async fn test_load_caption_track_rejects_non_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json");
        std::fs::write(&path, r#"{"text": "hi"}"#).unwrap();

        assert!(matches!(
            load_caption_track(&path).await,
            Err(WorkerError::InvalidInput(_))
        ));
    }
}
