//! Media engine boundary.
//!
//! The render pipeline never touches codecs directly. It drives an engine
//! through a small set of clip primitives (open, trim, crop, resize, text,
//! composite, encode) and owns the resulting clip handles through
//! [`OwnedClip`] guards, so every handle is released on every exit path.

use async_trait::async_trait;
use reel_models::{EncodingProfile, HorizontalAnchor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::error::MediaResult;
use crate::geometry::CropRect;

/// Opaque identifier of a clip held by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipHandle(u64);

impl ClipHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClipHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// Timeline and frame properties of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Glyph styling for a text clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextLook {
    /// Filled glyphs with an outline and optional background box.
    Styled {
        fill_color: String,
        outline_color: String,
        outline_width: u32,
        box_color: Option<String>,
        font_file: Option<String>,
    },
    /// Single-color glyphs with the engine's default font.
    Plain { fill_color: String },
}

/// Everything an engine needs to build one caption overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClipSpec {
    /// Final text, line breaks included
    pub text: String,
    pub font_size: u32,
    pub look: TextLook,
    pub horizontal_anchor: HorizontalAnchor,
    /// Horizontal space kept free on the canvas
    pub margin_px: u32,
    /// Vertical centre as a fraction of canvas height
    pub vertical_anchor: f64,
    /// Offset within the base clip, seconds
    pub start: f64,
    /// Visible duration, seconds
    pub duration: f64,
}

impl TextClipSpec {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Clip-level media operations.
///
/// Every method that returns a [`ClipHandle`] creates a new clip owned by the
/// caller; inputs are left untouched and must still be released.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Open a source file.
    async fn open(&self, path: &Path) -> MediaResult<ClipHandle>;

    /// Properties of an open clip.
    fn info(&self, clip: ClipHandle) -> MediaResult<ClipInfo>;

    /// Sub-range `[start, end]` of a clip, relative to the clip's own timeline.
    async fn trim(&self, clip: ClipHandle, start: f64, end: f64) -> MediaResult<ClipHandle>;

    /// Keep only `rect` of each frame.
    async fn crop(&self, clip: ClipHandle, rect: CropRect) -> MediaResult<ClipHandle>;

    /// Scale frames to exactly `width x height`.
    async fn resize(&self, clip: ClipHandle, width: u32, height: u32) -> MediaResult<ClipHandle>;

    /// Build a styled text overlay.
    async fn text(&self, spec: &TextClipSpec) -> MediaResult<ClipHandle>;

    /// Lay `overlays` over `base`. The result keeps the base timeline and frame rate.
    async fn composite(&self, base: ClipHandle, overlays: &[ClipHandle]) -> MediaResult<ClipHandle>;

    /// Encode a clip to `output`.
    async fn encode(&self, clip: ClipHandle, output: &Path, profile: &EncodingProfile) -> MediaResult<()>;

    /// Release a clip and any resources it holds.
    fn release(&self, clip: ClipHandle) -> MediaResult<()>;
}

/// Scoped owner of a clip handle. Dropping the guard releases the clip.
///
/// Release failures are logged and counted, never propagated, so they cannot
/// mask the error that caused an early return.
pub struct OwnedClip<'e> {
    engine: &'e dyn MediaEngine,
    handle: ClipHandle,
}

impl<'e> OwnedClip<'e> {
    pub fn new(engine: &'e dyn MediaEngine, handle: ClipHandle) -> Self {
        Self { engine, handle }
    }

    pub fn handle(&self) -> ClipHandle {
        self.handle
    }

    pub fn info(&self) -> MediaResult<ClipInfo> {
        self.engine.info(self.handle)
    }

    pub fn engine(&self) -> &'e dyn MediaEngine {
        self.engine
    }

    /// Take ownership of another handle from the same engine.
    pub fn adopt(&self, handle: ClipHandle) -> OwnedClip<'e> {
        OwnedClip::new(self.engine, handle)
    }
}

impl fmt::Debug for OwnedClip<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedClip").field(&self.handle).finish()
    }
}

impl Drop for OwnedClip<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.engine.release(self.handle) {
            metrics::counter!("reel_clip_release_failures_total").increment(1);
            warn!(clip = %self.handle, error = %e, "Failed to release clip");
        }
    }
}
