//! Caption segments and caption styling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{validate_range, ModelError, ModelResult};
use crate::interval::TimeRange;

/// Default caption font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 80;
/// Default caption fill color.
pub const DEFAULT_FILL_COLOR: &str = "yellow";
/// Default caption outline color.
pub const DEFAULT_OUTLINE_COLOR: &str = "black";
/// Default caption outline width in pixels.
pub const DEFAULT_OUTLINE_WIDTH: u32 = 3;
/// Default horizontal margin kept free on the canvas.
pub const DEFAULT_MARGIN_PX: u32 = 120;
/// Default vertical anchor as a fraction of canvas height.
pub const DEFAULT_VERTICAL_ANCHOR: f64 = 0.85;

/// A time-stamped piece of caption text.
///
/// Times are absolute source-video seconds when the segment comes from the
/// transcription service, and clip-relative seconds once rebased for a
/// highlight. Segments deserialized from external data are validated;
/// intermediate values produced by interval math are built directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCaptionSegment")]
pub struct CaptionSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
struct RawCaptionSegment {
    #[serde(default)]
    text: String,
    start: f64,
    end: f64,
}

impl TryFrom<RawCaptionSegment> for CaptionSegment {
    type Error = ModelError;

    fn try_from(raw: RawCaptionSegment) -> Result<Self, Self::Error> {
        CaptionSegment::new(raw.text, raw.start, raw.end)
    }
}

impl CaptionSegment {
    /// Create a caption segment, validating `0 <= start < end`.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> ModelResult<Self> {
        validate_range(start, end)?;
        Ok(Self {
            text: text.into(),
            start,
            end,
        })
    }

    /// Duration in seconds (may be negative for unvalidated values).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Time window covered by this segment.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// Horizontal placement of caption overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAnchor {
    Left,
    #[default]
    Center,
    Right,
}

impl HorizontalAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAnchor::Left => "left",
            HorizontalAnchor::Center => "center",
            HorizontalAnchor::Right => "right",
        }
    }
}

impl fmt::Display for HorizontalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HorizontalAnchor {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(HorizontalAnchor::Left),
            "center" | "centre" => Ok(HorizontalAnchor::Center),
            "right" => Ok(HorizontalAnchor::Right),
            _ => Err(ModelError::UnknownAnchor(s.to_string())),
        }
    }
}

/// Visual styling for burned-in captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    /// Font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Text fill color (FFmpeg color syntax)
    #[serde(default = "default_fill_color")]
    pub fill_color: String,

    /// Outline color
    #[serde(default = "default_outline_color")]
    pub outline_color: String,

    /// Outline width in pixels (0 disables the outline)
    #[serde(default = "default_outline_width")]
    pub outline_width: u32,

    /// Horizontal space that captions must leave free on the canvas
    #[serde(default = "default_margin_px")]
    pub margin_px: u32,

    /// Vertical centre of the caption block, as a fraction of canvas height
    #[serde(default = "default_vertical_anchor")]
    pub vertical_anchor: f64,

    /// Horizontal placement
    #[serde(default)]
    pub horizontal_anchor: HorizontalAnchor,

    /// Optional solid box drawn behind the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_color: Option<String>,

    /// Font file used for the styled overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_file: Option<String>,
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}
fn default_fill_color() -> String {
    DEFAULT_FILL_COLOR.to_string()
}
fn default_outline_color() -> String {
    DEFAULT_OUTLINE_COLOR.to_string()
}
fn default_outline_width() -> u32 {
    DEFAULT_OUTLINE_WIDTH
}
fn default_margin_px() -> u32 {
    DEFAULT_MARGIN_PX
}
fn default_vertical_anchor() -> f64 {
    DEFAULT_VERTICAL_ANCHOR
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            fill_color: DEFAULT_FILL_COLOR.to_string(),
            outline_color: DEFAULT_OUTLINE_COLOR.to_string(),
            outline_width: DEFAULT_OUTLINE_WIDTH,
            margin_px: DEFAULT_MARGIN_PX,
            vertical_anchor: DEFAULT_VERTICAL_ANCHOR,
            horizontal_anchor: HorizontalAnchor::Center,
            box_color: None,
            font_file: None,
        }
    }
}

impl CaptionStyle {
    /// White text on a black box at the bottom of the frame.
    pub fn boxed() -> Self {
        Self {
            font_size: 60,
            fill_color: "white".to_string(),
            outline_width: 0,
            margin_px: 100,
            vertical_anchor: 0.9,
            box_color: Some("black".to_string()),
            ..Default::default()
        }
    }

    /// Returns a copy using the given font file.
    pub fn with_font_file(mut self, font_file: impl Into<String>) -> Self {
        self.font_file = Some(font_file.into());
        self
    }

    /// Whether the style asks for an outline around the glyphs.
    pub fn has_outline(&self) -> bool {
        self.outline_width > 0
    }
}
