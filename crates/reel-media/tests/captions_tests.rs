//! Caption stage tests against the in-memory engine.

use std::path::Path;

use reel_media::{apply_captions, ClipInfo, FailurePlan, MediaEngine, MemoryEngine, OwnedClip, TextLook};
use reel_models::{CaptionSegment, CaptionStyle, EncodingProfile};

const BASE: ClipInfo = ClipInfo {
    duration: 15.0,
    width: 1080,
    height: 1920,
    fps: 30.0,
};

fn seg(text: &str, start: f64, end: f64) -> CaptionSegment {
    CaptionSegment {
        text: text.to_string(),
        start,
        end,
    }
}

async fn overlays_after(engine: &MemoryEngine, captions: &[CaptionSegment]) -> (usize, usize, Vec<reel_media::TextClipSpec>) {
    let base = OwnedClip::new(engine, engine.open(Path::new("/clip.mp4")).await.unwrap());
    let pass = apply_captions(base, captions, &CaptionStyle::default()).await.unwrap();
    assert_eq!(pass.clip.info().unwrap().duration, BASE.duration);
    assert_eq!(pass.clip.info().unwrap().fps, BASE.fps);

    engine
        .encode(pass.clip.handle(), Path::new("/out.mp4"), &EncodingProfile::default())
        .await
        .unwrap();
    let (overlays, skipped) = (pass.overlays, pass.skipped);
    drop(pass);

    let encoded = engine.encoded().pop().unwrap();
    (overlays, skipped, encoded.overlays)
}

#[tokio::test]
async fn test_overlapping_captions_render_simultaneously() {
    let engine = MemoryEngine::new().with_source("/clip.mp4", BASE);
    let captions = vec![seg("first line here", 1.0, 5.0), seg("second", 3.0, 6.0)];

    let (overlays, skipped, specs) = overlays_after(&engine, &captions).await;

    assert_eq!((overlays, skipped), (2, 0));
    assert_eq!(specs[0].text, "FIRST LINE HERE");
    assert_eq!((specs[0].start, specs[0].end()), (1.0, 5.0));
    assert_eq!((specs[1].start, specs[1].end()), (3.0, 6.0));
    assert_eq!(engine.live(), 0);
}

#[tokio::test]
async fn test_no_drawable_captions_returns_base() {
    let engine = MemoryEngine::new().with_source("/clip.mp4", BASE);
    let captions = vec![seg("", 1.0, 2.0), seg("late", 20.0, 22.0)];

    let (overlays, skipped, specs) = overlays_after(&engine, &captions).await;

    assert_eq!((overlays, skipped), (0, 2));
    assert!(specs.is_empty());
    // Only the base was ever opened
    assert_eq!(engine.opened(), 1);
    assert_eq!(engine.live(), 0);
}

#[tokio::test]
async fn test_styled_failure_falls_back_to_plain() {
    let engine = MemoryEngine::new()
        .with_source("/clip.mp4", BASE)
        .with_failures(FailurePlan {
            styled_text: true,
            ..Default::default()
        });

    let (overlays, _, specs) = overlays_after(&engine, &[seg("hello", 0.0, 2.0)]).await;

    assert_eq!(overlays, 1);
    assert!(matches!(specs[0].look, TextLook::Plain { .. }));
}

#[tokio::test]
async fn test_unrenderable_caption_is_skipped() {
    let engine = MemoryEngine::new()
        .with_source("/clip.mp4", BASE)
        .with_failures(FailurePlan {
            text_containing: Some("BAD".to_string()),
            ..Default::default()
        });

    let captions = vec![seg("good one", 0.0, 2.0), seg("bad glyphs", 3.0, 4.0), seg("good two", 5.0, 7.0)];
    let (overlays, skipped, specs) = overlays_after(&engine, &captions).await;

    assert_eq!((overlays, skipped), (2, 1));
    assert_eq!(specs[0].text, "GOOD ONE");
    assert_eq!(specs[1].text, "GOOD TWO");
    assert_eq!(engine.live(), 0);
}

#[tokio::test]
async fn test_caption_end_clamped_to_clip() {
    let engine = MemoryEngine::new().with_source("/clip.mp4", BASE);

    let (_, _, specs) = overlays_after(&engine, &[seg("tail", 14.0, 30.0)]).await;

    assert_eq!(specs.len(), 1);
    assert_eq!((specs[0].start, specs[0].duration), (14.0, 1.0));
}

#[tokio::test]
async fn test_long_caption_wraps_inside_margin() {
    let engine = MemoryEngine::new().with_source("/clip.mp4", BASE);
    let word = "goooo".repeat(30);

    let (overlays, skipped, specs) = overlays_after(&engine, &[seg(&word, 0.0, 2.0)]).await;

    assert_eq!((overlays, skipped), (1, 0));
    assert!(specs[0].text.lines().count() > 1);
    let budget = (BASE.width - CaptionStyle::default().margin_px) as f64;
    for line in specs[0].text.lines() {
        assert!(line.chars().count() as f64 * specs[0].font_size as f64 * 0.68 <= budget);
    }
}

#[tokio::test]
async fn test_caption_skipped_on_canvas_narrower_than_margin() {
    let narrow = ClipInfo { width: 100, ..BASE };
    let engine = MemoryEngine::new().with_source("/clip.mp4", narrow);
    let base = OwnedClip::new(&engine, engine.open(Path::new("/clip.mp4")).await.unwrap());

    let pass = apply_captions(base, &[seg("hello", 0.0, 2.0)], &CaptionStyle::default())
        .await
        .unwrap();

    assert_eq!((pass.overlays, pass.skipped), (0, 1));
    drop(pass);
    assert_eq!(engine.live(), 0);
}

#[tokio::test]
async fn test_control_character_caption_is_skipped() {
    let engine = MemoryEngine::new().with_source("/clip.mp4", BASE);
    let captions = vec![seg("bell\u{7}ring", 0.0, 2.0), seg("100% effort", 3.0, 5.0)];

    let (overlays, skipped, specs) = overlays_after(&engine, &captions).await;

    assert_eq!((overlays, skipped), (1, 1));
    assert_eq!(specs[0].text, "100% EFFORT");
    assert_eq!(engine.live(), 0);
}
