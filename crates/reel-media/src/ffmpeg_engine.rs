//! FFmpeg-backed media engine.
//!
//! Clip operations are recorded lazily as a filter chain per clip; nothing is
//! decoded until [`MediaEngine::encode`] runs a single FFmpeg pass that seeks
//! to the trim window and applies the accumulated filters.

use async_trait::async_trait;
use reel_models::EncodingProfile;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::engine::{ClipHandle, ClipInfo, MediaEngine, TextClipSpec, TextLook};
use crate::error::{MediaError, MediaResult};
use crate::filters::{check_drawtext_text, filter_crop, filter_drawtext, filter_scale};
use crate::geometry::CropRect;
use crate::probe::probe_video;

/// Slack allowed when comparing requested times against probed durations.
const TIME_EPSILON: f64 = 1e-3;

/// A video clip described as source + window + filter chain.
#[derive(Debug, Clone)]
struct VideoNode {
    source: PathBuf,
    info: ClipInfo,
    /// Absolute `[start, end]` window in the source
    window: Option<(f64, f64)>,
    filters: Vec<String>,
    /// Caption text files referenced by `filters`
    text_files: Vec<Arc<TempPath>>,
}

/// A caption overlay waiting to be composited.
#[derive(Debug)]
struct TextNode {
    filter: String,
    text_file: Arc<TempPath>,
    duration: f64,
}

#[derive(Debug)]
enum ClipNode {
    Video(VideoNode),
    Text(TextNode),
}

/// [`MediaEngine`] driving the `ffmpeg`/`ffprobe` command line tools.
pub struct FfmpegEngine {
    next_id: AtomicU64,
    clips: Mutex<HashMap<u64, ClipNode>>,
    runner: FfmpegRunner,
    scratch_dir: Option<PathBuf>,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            clips: Mutex::new(HashMap::new()),
            runner: FfmpegRunner::new(),
            scratch_dir: None,
        }
    }

    /// Write caption text files under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Bound every encode by a timeout.
    pub fn with_encode_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// Number of clips currently held.
    pub fn open_clips(&self) -> usize {
        self.clips().map(|clips| clips.len()).unwrap_or(0)
    }

    fn clips(&self) -> MediaResult<MutexGuard<'_, HashMap<u64, ClipNode>>> {
        self.clips
            .lock()
            .map_err(|_| MediaError::internal("clip registry lock poisoned"))
    }

    fn insert(&self, node: ClipNode) -> MediaResult<ClipHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clips()?.insert(id, node);
        Ok(ClipHandle::new(id))
    }

    fn video(&self, clip: ClipHandle) -> MediaResult<VideoNode> {
        match self.clips()?.get(&clip.id()) {
            Some(ClipNode::Video(node)) => Ok(node.clone()),
            Some(ClipNode::Text(_)) => Err(MediaError::unsupported(format!(
                "{} is a text overlay, not a video clip",
                clip
            ))),
            None => Err(MediaError::UnknownClip(clip.id())),
        }
    }

    fn write_text_file(&self, text: &str) -> MediaResult<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("caption_").suffix(".txt");
        let mut file: NamedTempFile = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn open(&self, path: &Path) -> MediaResult<ClipHandle> {
        let probed = probe_video(path).await?;
        debug!(
            path = %path.display(),
            duration = probed.duration,
            width = probed.width,
            height = probed.height,
            "Opened source"
        );

        self.insert(ClipNode::Video(VideoNode {
            source: path.to_path_buf(),
            info: probed.clip_info(),
            window: None,
            filters: Vec::new(),
            text_files: Vec::new(),
        }))
    }

    fn info(&self, clip: ClipHandle) -> MediaResult<ClipInfo> {
        match self.clips()?.get(&clip.id()) {
            Some(ClipNode::Video(node)) => Ok(node.info),
            Some(ClipNode::Text(node)) => Ok(ClipInfo {
                duration: node.duration,
                width: 0,
                height: 0,
                fps: 0.0,
            }),
            None => Err(MediaError::UnknownClip(clip.id())),
        }
    }

    async fn trim(&self, clip: ClipHandle, start: f64, end: f64) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;

        if !node.filters.is_empty() {
            return Err(MediaError::unsupported("trim after filters"));
        }
        if !(start >= 0.0 && end > start && end <= node.info.duration + TIME_EPSILON) {
            return Err(MediaError::InvalidTimeRange {
                start,
                end,
                duration: node.info.duration,
            });
        }

        let offset = node.window.map(|(ws, _)| ws).unwrap_or(0.0);
        node.window = Some((offset + start, offset + end));
        node.info.duration = end - start;

        self.insert(ClipNode::Video(node))
    }

    async fn crop(&self, clip: ClipHandle, rect: CropRect) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;
        let (width, height) = (node.info.width, node.info.height);

        if rect.width == 0
            || rect.height == 0
            || rect.x + rect.width > width
            || rect.y + rect.height > height
        {
            return Err(MediaError::invalid_dimensions(
                width,
                height,
                format!("crop {:?} outside frame", rect),
            ));
        }

        node.filters.push(filter_crop(rect));
        node.info.width = rect.width;
        node.info.height = rect.height;

        self.insert(ClipNode::Video(node))
    }

    async fn resize(&self, clip: ClipHandle, width: u32, height: u32) -> MediaResult<ClipHandle> {
        let mut node = self.video(clip)?;

        if width == 0 || height == 0 {
            return Err(MediaError::invalid_dimensions(width, height, "resize target"));
        }

        node.filters.push(filter_scale(width, height));
        node.info.width = width;
        node.info.height = height;

        self.insert(ClipNode::Video(node))
    }

    async fn text(&self, spec: &TextClipSpec) -> MediaResult<ClipHandle> {
        if spec.text.trim().is_empty() {
            return Err(MediaError::unsupported("empty caption text"));
        }
        check_drawtext_text(&spec.text)?;
        if let TextLook::Styled {
            font_file: Some(font),
            ..
        } = &spec.look
        {
            if !Path::new(font).exists() {
                return Err(MediaError::FileNotFound(PathBuf::from(font)));
            }
        }

        let text_file = self.write_text_file(&spec.text)?;
        let filter = filter_drawtext(spec, &text_file.to_string_lossy());

        self.insert(ClipNode::Text(TextNode {
            filter,
            text_file: Arc::new(text_file),
            duration: spec.duration,
        }))
    }

    async fn composite(&self, base: ClipHandle, overlays: &[ClipHandle]) -> MediaResult<ClipHandle> {
        let mut node = self.video(base)?;

        {
            let clips = self.clips()?;
            for overlay in overlays {
                match clips.get(&overlay.id()) {
                    Some(ClipNode::Text(text)) => {
                        node.filters.push(text.filter.clone());
                        node.text_files.push(Arc::clone(&text.text_file));
                    }
                    Some(ClipNode::Video(_)) => {
                        return Err(MediaError::unsupported(format!(
                            "{} is a video clip, only text overlays can be composited",
                            overlay
                        )))
                    }
                    None => return Err(MediaError::UnknownClip(overlay.id())),
                }
            }
        }

        // drawtext only paints frames; timeline and rate are the base's
        self.insert(ClipNode::Video(node))
    }

    async fn encode(&self, clip: ClipHandle, output: &Path, profile: &EncodingProfile) -> MediaResult<()> {
        let node = self.video(clip)?;

        let mut cmd = FfmpegCommand::new(&node.source, output);
        if let Some((start, end)) = node.window {
            cmd = cmd.seek(start).duration(end - start);
        }
        if !node.filters.is_empty() {
            cmd = cmd.video_filter(node.filters.join(","));
        }
        cmd = cmd.output_args(profile.to_ffmpeg_args()).faststart();

        let total = node.info.duration;
        let target = output.display().to_string();
        self.runner
            .run_observed(&cmd, move |progress| {
                debug!(
                    output = %target,
                    percent = progress.percent_of(total),
                    eta_secs = progress.eta_secs(total),
                    "Encode progress"
                );
            })
            .await?;

        let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(MediaError::ffmpeg_failed(
                format!("Encoder produced no output at {}", output.display()),
                None,
                None,
            ));
        }

        info!(output = %output.display(), size_bytes = size, "Encoded clip");
        Ok(())
    }

    fn release(&self, clip: ClipHandle) -> MediaResult<()> {
        let node = self
            .clips()?
            .remove(&clip.id())
            .ok_or(MediaError::UnknownClip(clip.id()))?;

        // Delete caption files no other clip references
        let files = match node {
            ClipNode::Video(video) => video.text_files,
            ClipNode::Text(text) => vec![text.text_file],
        };
        for file in files {
            if let Ok(path) = Arc::try_unwrap(file) {
                path.close()?;
            }
        }

        Ok(())
    }
}
