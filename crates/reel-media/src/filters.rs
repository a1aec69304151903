//! FFmpeg video filter builders.

use reel_models::HorizontalAnchor;

use crate::engine::{TextClipSpec, TextLook};
use crate::error::{MediaError, MediaResult};
use crate::geometry::CropRect;

/// Extra pixels between caption lines.
const LINE_SPACING: u32 = 8;
/// Padding around the optional caption box.
const BOX_BORDER: u32 = 12;

/// Crop filter for a rect.
pub fn filter_crop(rect: CropRect) -> String {
    format!("crop={}:{}:{}:{}", rect.width, rect.height, rect.x, rect.y)
}

/// Exact scale filter with square pixels.
pub fn filter_scale(width: u32, height: u32) -> String {
    format!("scale={}:{},setsar=1", width, height)
}

/// Escape a value for use inside a single-quoted filter option.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Reject caption text `drawtext` cannot lay out: control characters other
/// than the line breaks the caption formatter inserts.
///
/// `%` and `\` are fine; [`filter_drawtext`] turns text expansion off.
pub fn check_drawtext_text(text: &str) -> MediaResult<()> {
    match text.chars().find(|c| c.is_control() && *c != '\n') {
        Some(c) => Err(MediaError::unsupported(format!(
            "caption contains control character U+{:04X}",
            c as u32
        ))),
        None => Ok(()),
    }
}

/// `drawtext` filter rendering `spec` with the text read from `text_file`.
///
/// The text is drawn literally (`expansion=none`). The overlay is only
/// enabled during `[spec.start, spec.end()]` of the clip timeline.
pub fn filter_drawtext(spec: &TextClipSpec, text_file: &str) -> String {
    let half_margin = spec.margin_px / 2;
    let x = match spec.horizontal_anchor {
        HorizontalAnchor::Left => format!("{}", half_margin),
        HorizontalAnchor::Center => "(w-text_w)/2".to_string(),
        HorizontalAnchor::Right => format!("w-text_w-{}", half_margin),
    };
    let y = format!("h*{:.4}-text_h/2", spec.vertical_anchor);

    let mut parts = vec![
        format!("textfile='{}'", escape_filter_value(text_file)),
        "expansion=none".to_string(),
        format!("fontsize={}", spec.font_size),
        format!("line_spacing={}", LINE_SPACING),
    ];

    match &spec.look {
        TextLook::Styled {
            fill_color,
            outline_color,
            outline_width,
            box_color,
            font_file,
        } => {
            if let Some(font) = font_file {
                parts.push(format!("fontfile='{}'", escape_filter_value(font)));
            }
            parts.push(format!("fontcolor={}", fill_color));
            if *outline_width > 0 {
                parts.push(format!("borderw={}", outline_width));
                parts.push(format!("bordercolor={}", outline_color));
            }
            if let Some(color) = box_color {
                parts.push("box=1".to_string());
                parts.push(format!("boxcolor={}", color));
                parts.push(format!("boxborderw={}", BOX_BORDER));
            }
        }
        TextLook::Plain { fill_color } => {
            parts.push(format!("fontcolor={}", fill_color));
        }
    }

    parts.push(format!("x={}", x));
    parts.push(format!("y={}", y));
    parts.push(format!(
        "enable='between(t,{:.3},{:.3})'",
        spec.start,
        spec.end()
    ));

    format!("drawtext={}", parts.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(look: TextLook) -> TextClipSpec {
        TextClipSpec {
            text: "HELLO".to_string(),
            font_size: 80,
            look,
            horizontal_anchor: HorizontalAnchor::Center,
            margin_px: 120,
            vertical_anchor: 0.85,
            start: 2.0,
            duration: 2.0,
        }
    }

    #[test]
    fn test_crop_and_scale() {
        let rect = CropRect {
            x: 656,
            y: 0,
            width: 607,
            height: 1080,
        };
        assert_eq!(filter_crop(rect), "crop=607:1080:656:0");
        assert_eq!(filter_scale(1080, 1920), "scale=1080:1920,setsar=1");
    }

    #[test]
    fn test_styled_drawtext() {
        let filter = filter_drawtext(
            &spec(TextLook::Styled {
                fill_color: "yellow".to_string(),
                outline_color: "black".to_string(),
                outline_width: 3,
                box_color: None,
                font_file: Some("/fonts/Bold.ttf".to_string()),
            }),
            "/tmp/cap.txt",
        );

        assert!(filter.starts_with("drawtext=textfile='/tmp/cap.txt':expansion=none:"));
        assert!(filter.contains("fontfile='/fonts/Bold.ttf'"));
        assert!(filter.contains("fontcolor=yellow"));
        assert!(filter.contains("borderw=3:bordercolor=black"));
        assert!(filter.contains("x=(w-text_w)/2"));
        assert!(filter.contains("y=h*0.8500-text_h/2"));
        assert!(filter.contains("enable='between(t,2.000,4.000)'"));
        assert!(!filter.contains("box=1"));
    }

    #[test]
    fn test_plain_drawtext_has_no_outline() {
        let filter = filter_drawtext(
            &spec(TextLook::Plain {
                fill_color: "white".to_string(),
            }),
            "/tmp/cap.txt",
        );
        assert!(filter.contains("fontcolor=white"));
        assert!(!filter.contains("borderw"));
        assert!(!filter.contains("fontfile"));
    }

    #[test]
    fn test_anchor_positions() {
        let mut s = spec(TextLook::Plain {
            fill_color: "white".to_string(),
        });
        s.horizontal_anchor = HorizontalAnchor::Right;
        assert!(filter_drawtext(&s, "f").contains("x=w-text_w-60"));
        s.horizontal_anchor = HorizontalAnchor::Left;
        assert!(filter_drawtext(&s, "f").contains("x=60:"));
    }

    #[test]
    fn test_plain_drawtext_disables_expansion() {
        let filter = filter_drawtext(
            &spec(TextLook::Plain {
                fill_color: "white".to_string(),
            }),
            "/tmp/cap.txt",
        );
        assert!(filter.contains(":expansion=none:"));
    }

    #[test]
    fn test_drawtext_text_check() {
        assert!(check_drawtext_text("WE WON 100%\nOF IT").is_ok());
        assert!(check_drawtext_text("C:\\PATH {X}").is_ok());
        assert!(matches!(
            check_drawtext_text("BELL\u{7}"),
            Err(MediaError::Unsupported(_))
        ));
        assert!(check_drawtext_text("TAB\tHERE").is_err());
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("C:\\fonts\\a'b.ttf"), "C\\:\\\\fonts\\\\a\\'b.ttf");
    }
}
