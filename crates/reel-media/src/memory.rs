//! In-memory media engine.
//!
//! Tracks clips as plain data and records every encode instead of running
//! FFmpeg. Used for dry runs (render plans without producing video) and as
//! the engine under test for the pipeline.

use async_trait::async_trait;
use reel_models::EncodingProfile;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::engine::{ClipHandle, ClipInfo, MediaEngine, TextClipSpec, TextLook};
use crate::error::{MediaError, MediaResult};
use crate::filters::check_drawtext_text;
use crate::geometry::CropRect;
use crate::probe::probe_video;

/// One recorded encode.
#[derive(Debug, Clone, Serialize)]
pub struct EncodedClip {
    pub output: PathBuf,
    pub source: PathBuf,
    /// Absolute `[start, end]` window in the source
    pub window: (f64, f64),
    pub crop: Option<CropRect>,
    pub info: ClipInfo,
    pub overlays: Vec<TextClipSpec>,
    pub profile: EncodingProfile,
}

#[derive(Debug, Clone)]
struct VideoNode {
    source: PathBuf,
    window: (f64, f64),
    crop: Option<CropRect>,
    info: ClipInfo,
    overlays: Vec<TextClipSpec>,
}

#[derive(Debug, Clone)]
enum Node {
    Video(VideoNode),
    Text(TextClipSpec),
}

/// Failure injection switches.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    /// Styled text overlays fail
    pub styled_text: bool,
    /// Every text overlay containing this string fails
    pub text_containing: Option<String>,
    /// Encodes to outputs whose file name contains this string fail
    pub encode_containing: Option<String>,
    /// Releases fail (after removing the clip)
    pub release: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<u64, Node>,
    sources: HashMap<PathBuf, ClipInfo>,
    encoded: Vec<EncodedClip>,
    opened: usize,
    released: usize,
}

/// [`MediaEngine`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    next_id: AtomicU64,
    state: Mutex<State>,
    failures: FailurePlan,
    write_outputs: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known source properties; unknown sources are probed with ffprobe.
    pub fn with_source(self, path: impl Into<PathBuf>, info: ClipInfo) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.sources.insert(path.into(), info);
        }
        self
    }

    pub fn with_failures(mut self, failures: FailurePlan) -> Self {
        self.failures = failures;
        self
    }

    /// Write each encode's plan as JSON to its output path.
    pub fn with_output_files(mut self, write: bool) -> Self {
        self.write_outputs = write;
        self
    }

    /// Encodes recorded so far, in completion order.
    pub fn encoded(&self) -> Vec<EncodedClip> {
        self.state().map(|s| s.encoded.clone()).unwrap_or_default()
    }

    /// Clips opened or derived so far.
    pub fn opened(&self) -> usize {
        self.state().map(|s| s.opened).unwrap_or(0)
    }

    /// Clips released so far.
    pub fn released(&self) -> usize {
        self.state().map(|s| s.released).unwrap_or(0)
    }

    /// Clips still held.
    pub fn live(&self) -> usize {
        self.state().map(|s| s.nodes.len()).unwrap_or(0)
    }

    fn state(&self) -> MediaResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| MediaError::internal("memory engine lock poisoned"))
    }

    fn insert(&self, node: Node) -> MediaResult<ClipHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state()?;
        state.nodes.insert(id, node);
        state.opened += 1;
        Ok(ClipHandle::new(id))
    }

    fn video(&self, clip: ClipHandle) -> MediaResult<VideoNode> {
        match self.state()?.nodes.get(&clip.id()) {
            Some(Node::Video(node)) => Ok(node.clone()),
            Some(Node::Text(_)) => Err(MediaError::unsupported(format!("{} is a text overlay", clip))),
            None => Err(MediaError::UnknownClip(clip.id())),
        }
    }
}

#[async_trait]
impl MediaEngine for MemoryEngine {
    async fn open(&self, path: &Path) -> MediaResult<ClipHandle> {
        let known = self.state()?.sources.get(path).copied();
        let info = match known {
            Some(info) => info,
            None => probe_video(path).await?.clip_info(),
        };

        self.insert(Node::Video(VideoNode {
            source: path.to_path_buf(),
            window: (0.0, info.duration),
            crop: None,
            info,
            overlays: Vec::new(),
        }))
    }

    fn info(&self, clip: ClipHandle) -> MediaResult<ClipInfo> {
        match self.state()?.nodes.get(&clip.id()) {
            Some(Node::Video(node)) => Ok(node.info),
            Some(Node::Text(spec)) => Ok(ClipInfo {
                duration: spec.duration,
                width: 0,
                height: 0,
                fps: 0.0,
            }),
            None => Err(MediaError::UnknownClip(clip.id())),
        }
    }

    async fn trim(&self, clip: ClipHandle, start: f64, end: f64) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;
        if !(start >= 0.0 && end > start && end <= node.info.duration) {
            return Err(MediaError::InvalidTimeRange {
                start,
                end,
                duration: node.info.duration,
            });
        }

        let origin = node.window.0;
        node.window = (origin + start, origin + end);
        node.info.duration = end - start;
        self.insert(Node::Video(node))
    }

    async fn crop(&self, clip: ClipHandle, rect: CropRect) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;
        if rect.x + rect.width > node.info.width || rect.y + rect.height > node.info.height {
            return Err(MediaError::invalid_dimensions(
                node.info.width,
                node.info.height,
                "crop outside frame",
            ));
        }

        node.crop = Some(rect);
        node.info.width = rect.width;
        node.info.height = rect.height;
        self.insert(Node::Video(node))
    }

    async fn resize(&self, clip: ClipHandle, width: u32, height: u32) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;
        node.info.width = width;
        node.info.height = height;
        self.insert(Node::Video(node))
    }

    async fn text(&self, spec: &TextClipSpec) -> MediaResult<ClipHandle> {
        check_drawtext_text(&spec.text)?;
        if self.failures.styled_text && matches!(spec.look, TextLook::Styled { .. }) {
            return Err(MediaError::unsupported("styled text"));
        }
        if let Some(needle) = &self.failures.text_containing {
            if spec.text.contains(needle.as_str()) {
                return Err(MediaError::unsupported(format!("unrenderable text: {}", spec.text)));
            }
        }
        self.insert(Node::Text(spec.clone()))
    }

    async fn composite(&self, base: ClipHandle, overlays: &[ClipHandle]) -> MediaResult<ClipHandle> {
        let mut node = self.video(base)?;
        {
            let state = self.state()?;
            for overlay in overlays {
                match state.nodes.get(&overlay.id()) {
                    Some(Node::Text(spec)) => node.overlays.push(spec.clone()),
                    Some(Node::Video(_)) => {
                        return Err(MediaError::unsupported("video overlays are not supported"))
                    }
                    None => return Err(MediaError::UnknownClip(overlay.id())),
                }
            }
        }
        self.insert(Node::Video(node))
    }

    async fn encode(&self, clip: ClipHandle, output: &Path, profile: &EncodingProfile) -> MediaResult<()> {
        let node = self.video(clip)?;

        if let Some(needle) = &self.failures.encode_containing {
            let name = output.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            if name.contains(needle.as_str()) {
                return Err(MediaError::ffmpeg_failed("injected encode failure", None, Some(1)));
            }
        }

        let record = EncodedClip {
            output: output.to_path_buf(),
            source: node.source,
            window: node.window,
            crop: node.crop,
            info: ClipInfo {
                fps: profile.fps as f64,
                ..node.info
            },
            overlays: node.overlays,
            profile: profile.clone(),
        };

        if self.write_outputs {
            tokio::fs::write(output, serde_json::to_vec_pretty(&record)?).await?;
        }

        self.state()?.encoded.push(record);
        Ok(())
    }

    fn release(&self, clip: ClipHandle) -> MediaResult<()> {
        let mut state = self.state()?;
        state
            .nodes
            .remove(&clip.id())
            .ok_or(MediaError::UnknownClip(clip.id()))?;
        state.released += 1;

        if self.failures.release {
            return Err(MediaError::internal("injected release failure"));
        }
        Ok(())
    }
}
