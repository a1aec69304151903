//! Caption render stage.
//!
//! Turns a clip-relative caption track into timed text overlays and
//! composites them over a base clip. A caption that cannot be rendered is
//! skipped; it never fails the clip.

use reel_models::{CaptionSegment, CaptionStyle, MIN_VISIBLE_DURATION};
use tracing::{debug, warn};

use crate::engine::{OwnedClip, TextClipSpec, TextLook};
use crate::error::{MediaError, MediaResult};

/// Words per caption line.
pub const WORDS_PER_LINE: usize = 3;
/// Upper bound of the average uppercase glyph advance, as a fraction of the
/// font size. Default sans fonts average about 0.68.
const GLYPH_WIDTH_RATIO: f64 = 0.72;
/// Smallest font size layout will shrink to.
const MIN_FONT_SIZE: u32 = 12;
/// Allowed drift between base and composited timelines.
const TIMELINE_EPSILON: f64 = 1e-6;

/// Group words three per line and uppercase them.
pub fn format_caption_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .chunks(WORDS_PER_LINE)
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .to_uppercase()
}

/// Estimated rendered width of a `chars`-long line at `font_size`.
pub fn estimated_line_width(chars: usize, font_size: u32, outline_width: u32) -> f64 {
    chars as f64 * font_size as f64 * GLYPH_WIDTH_RATIO + 2.0 * outline_width as f64
}

/// Text and font size that keep every line of `text` inside
/// `canvas_width - style.margin_px`.
///
/// The font shrinks down to a minimum size; lines still too wide at that size
/// are broken by characters. `None` when not even one glyph fits.
pub fn layout_caption(text: &str, style: &CaptionStyle, canvas_width: u32) -> Option<(String, u32)> {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    if longest == 0 {
        return Some((text.to_string(), style.font_size));
    }

    let max_width = canvas_width.saturating_sub(style.margin_px) as f64;
    let fits = |chars: usize, size: u32| estimated_line_width(chars, size, style.outline_width) <= max_width;

    if fits(longest, style.font_size) {
        return Some((text.to_string(), style.font_size));
    }

    let room = max_width - 2.0 * style.outline_width as f64;
    let min_size = MIN_FONT_SIZE.min(style.font_size);
    let shrunk = (room / (longest as f64 * GLYPH_WIDTH_RATIO)).floor().max(0.0) as u32;
    let size = shrunk.clamp(min_size, style.font_size);
    if fits(longest, size) {
        return Some((text.to_string(), size));
    }

    let per_line = (room / (min_size as f64 * GLYPH_WIDTH_RATIO)).floor().max(0.0) as usize;
    if per_line == 0 {
        return None;
    }
    let wrapped = text
        .lines()
        .flat_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            chars
                .chunks(per_line)
                .map(|chunk| chunk.iter().collect::<String>())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some((wrapped, min_size))
}

/// Visible `(start, duration)` of a caption within a clip of `clip_duration`
/// seconds, or `None` when the caption should be skipped.
pub fn caption_window(caption: &CaptionSegment, clip_duration: f64) -> Option<(f64, f64)> {
    if caption.text.trim().is_empty() {
        return None;
    }
    if caption.end <= caption.start || caption.start < 0.0 || caption.start >= clip_duration {
        return None;
    }

    let end = caption.end.min(clip_duration);
    let duration = end - caption.start;
    if duration < MIN_VISIBLE_DURATION {
        return None;
    }

    Some((caption.start, duration))
}

/// Overlay spec for a caption in the configured style, or `None` when the
/// caption cannot fit the canvas.
pub fn styled_spec(
    text: &str,
    start: f64,
    duration: f64,
    style: &CaptionStyle,
    canvas_width: u32,
) -> Option<TextClipSpec> {
    let (text, font_size) = layout_caption(&format_caption_text(text), style, canvas_width)?;
    Some(TextClipSpec {
        font_size,
        text,
        look: TextLook::Styled {
            fill_color: style.fill_color.clone(),
            outline_color: style.outline_color.clone(),
            outline_width: style.outline_width,
            box_color: style.box_color.clone(),
            font_file: style.font_file.clone(),
        },
        horizontal_anchor: style.horizontal_anchor,
        margin_px: style.margin_px,
        vertical_anchor: style.vertical_anchor,
        start,
        duration,
    })
}

/// The same overlay reduced to plain text with the engine's default font.
pub fn plain_spec(styled: &TextClipSpec, style: &CaptionStyle) -> TextClipSpec {
    TextClipSpec {
        look: TextLook::Plain {
            fill_color: style.fill_color.clone(),
        },
        ..styled.clone()
    }
}

/// Result of a caption pass.
#[derive(Debug)]
pub struct CaptionPass<'e> {
    /// Composited clip, or the untouched base when nothing was drawn
    pub clip: OwnedClip<'e>,
    /// Overlays composited
    pub overlays: usize,
    /// Captions skipped by the inclusion rules or render failures
    pub skipped: usize,
}

fn record_skip(reason: &'static str) {
    metrics::counter!("reel_caption_overlays_skipped_total", "reason" => reason).increment(1);
}

/// Draw `captions` (clip-relative) over `base`.
///
/// Consumes the base guard; it is released once the composite exists. With
/// zero drawable captions the base is returned as is.
pub async fn apply_captions<'e>(
    base: OwnedClip<'e>,
    captions: &[CaptionSegment],
    style: &CaptionStyle,
) -> MediaResult<CaptionPass<'e>> {
    let engine = base.engine();
    let base_info = base.info()?;

    let mut overlays: Vec<OwnedClip<'e>> = Vec::with_capacity(captions.len());
    let mut skipped = 0;

    for (i, caption) in captions.iter().enumerate() {
        let Some((start, duration)) = caption_window(caption, base_info.duration) else {
            debug!(caption = i, start = caption.start, end = caption.end, "Caption outside clip, skipping");
            record_skip("out_of_range");
            skipped += 1;
            continue;
        };

        let Some(styled) = styled_spec(&caption.text, start, duration, style, base_info.width) else {
            warn!(caption = i, width = base_info.width, "Caption cannot fit the canvas, skipping");
            record_skip("too_wide");
            skipped += 1;
            continue;
        };
        let handle = match engine.text(&styled).await {
            Ok(handle) => handle,
            Err(styled_err) => {
                warn!(caption = i, error = %styled_err, "Styled caption failed, falling back to plain text");
                match engine.text(&plain_spec(&styled, style)).await {
                    Ok(handle) => handle,
                    Err(plain_err) => {
                        warn!(caption = i, error = %plain_err, text = %caption.text, "Caption could not be rendered, skipping");
                        record_skip("render_failed");
                        skipped += 1;
                        continue;
                    }
                }
            }
        };
        overlays.push(base.adopt(handle));
    }

    if overlays.is_empty() {
        return Ok(CaptionPass {
            clip: base,
            overlays: 0,
            skipped,
        });
    }

    let handles: Vec<_> = overlays.iter().map(OwnedClip::handle).collect();
    let composed = base.adopt(engine.composite(base.handle(), &handles).await?);

    let composed_info = composed.info()?;
    if (composed_info.duration - base_info.duration).abs() > TIMELINE_EPSILON
        || (composed_info.fps - base_info.fps).abs() > TIMELINE_EPSILON
    {
        return Err(MediaError::internal(format!(
            "composite changed timeline: {:.3}s@{:.3}fps -> {:.3}s@{:.3}fps",
            base_info.duration, base_info.fps, composed_info.duration, composed_info.fps
        )));
    }

    Ok(CaptionPass {
        clip: composed,
        overlays: handles.len(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, end: f64) -> CaptionSegment {
        CaptionSegment {
            text: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_format_groups_three_words() {
        assert_eq!(
            format_caption_text("what a save by the keeper tonight"),
            "WHAT A SAVE\nBY THE KEEPER\nTONIGHT"
        );
        assert_eq!(format_caption_text("  hi   there "), "HI THERE");
        assert_eq!(format_caption_text(""), "");
    }

    #[test]
    fn test_caption_window_rules() {
        assert_eq!(caption_window(&seg("hi", 2.0, 4.0), 15.0), Some((2.0, 2.0)));
        assert_eq!(caption_window(&seg("   ", 2.0, 4.0), 15.0), None);
        assert_eq!(caption_window(&seg("hi", 4.0, 4.0), 15.0), None);
        assert_eq!(caption_window(&seg("hi", -1.0, 4.0), 15.0), None);
        assert_eq!(caption_window(&seg("hi", 15.0, 16.0), 15.0), None);

        // End clamped to the clip
        let (start, duration) = caption_window(&seg("hi", 14.0, 20.0), 15.0).unwrap();
        assert_eq!((start, duration), (14.0, 1.0));

        // Clamped remainder too short
        assert_eq!(caption_window(&seg("hi", 14.95, 20.0), 15.0), None);
    }

    fn assert_fits(text: &str, size: u32, style: &CaptionStyle, canvas_width: u32) {
        let budget = (canvas_width - style.margin_px) as f64;
        for line in text.lines() {
            let chars = line.chars().count();
            assert!(estimated_line_width(chars, size, style.outline_width) <= budget, "{line:?} at {size}");
            // Measured uppercase advance of the default sans font
            assert!(chars as f64 * size as f64 * 0.68 <= budget, "{line:?} at {size}");
        }
    }

    #[test]
    fn test_font_shrinks_to_margin() {
        let style = CaptionStyle::default();
        let (short, size) = layout_caption(&format_caption_text("go"), &style, 1080).unwrap();
        assert_eq!((short.as_str(), size), ("GO", 80));

        let long = format_caption_text("extraordinarilylongword");
        let (text, size) = layout_caption(&long, &style, 1080).unwrap();
        assert_eq!(text, long);
        assert!(size < 80);
        assert_fits(&text, size, &style, 1080);
    }

    #[test]
    fn test_uppercase_line_fits_with_real_glyph_widths() {
        let style = CaptionStyle::default();
        let text = format_caption_text("extraordinary championship performances");
        assert_eq!(text, "EXTRAORDINARY CHAMPIONSHIP PERFORMANCES");

        let (laid_out, size) = layout_caption(&text, &style, 1080).unwrap();
        assert_eq!(laid_out, text);
        assert_fits(&laid_out, size, &style, 1080);
    }

    #[test]
    fn test_overlong_word_is_broken_at_minimum_size() {
        let style = CaptionStyle::default();
        let word = "A".repeat(150);

        let (text, size) = layout_caption(&word, &style, 1080).unwrap();

        assert_eq!(size, MIN_FONT_SIZE);
        assert!(text.lines().count() > 1);
        assert_eq!(text.replace('\n', ""), word);
        assert_fits(&text, size, &style, 1080);
    }

    #[test]
    fn test_caption_rejected_when_nothing_fits() {
        let style = CaptionStyle::default();
        // Canvas narrower than the margin
        assert!(layout_caption("HI", &style, 100).is_none());
        assert!(styled_spec("hi", 0.0, 1.0, &style, 100).is_none());
    }

    #[test]
    fn test_plain_spec_drops_styling() {
        let style = CaptionStyle::default();
        let styled = styled_spec("hello world", 1.0, 2.0, &style, 1080).unwrap();
        assert_eq!(styled.text, "HELLO WORLD");

        let plain = plain_spec(&styled, &style);
        assert_eq!(plain.text, styled.text);
        assert_eq!(plain.start, 1.0);
        assert!(matches!(plain.look, TextLook::Plain { .. }));
    }
}
