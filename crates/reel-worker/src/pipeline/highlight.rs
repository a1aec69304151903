//! Single-highlight render pipeline.
//!
//! `Extract -> Transform -> (Caption | skip) -> Encode`. Any step failing
//! ends the render with a [`RenderError`] naming that step. Every clip
//! handle is held by an [`OwnedClip`] guard and released on every exit path.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::Rng;
use reel_media::{apply_captions, plan_transform, MediaEngine, MediaError, OwnedClip};
use reel_models::{
    adhoc_output_filename, captions_for_window, AspectRatio, CaptionSegment, CaptionStyle,
    EncodingProfile, Highlight, ResizeMethod, TimeRange,
};
use tracing::{debug, info, warn};

use crate::error::{RenderError, RenderStage, StageExt};
use crate::metrics;

/// Knobs shared by every highlight of a render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub resize_method: ResizeMethod,
    pub add_captions: bool,
    pub caption_style: CaptionStyle,
    pub aspect: AspectRatio,
    pub profile: EncodingProfile,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new(ResizeMethod::Crop, true)
    }
}

impl RenderOptions {
    pub fn new(resize_method: ResizeMethod, add_captions: bool) -> Self {
        Self {
            resize_method,
            add_captions,
            caption_style: CaptionStyle::default(),
            aspect: AspectRatio::PORTRAIT,
            profile: EncodingProfile::default(),
        }
    }

    pub fn with_caption_style(mut self, style: CaptionStyle) -> Self {
        self.caption_style = style;
        self
    }
}

/// Working state for one highlight.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: PathBuf,
    /// Absolute window in the source
    pub window: TimeRange,
    /// Captions rebased and clamped to `[0, window.duration()]`
    pub captions: Vec<CaptionSegment>,
    pub output_dir: PathBuf,
    pub output_name: String,
}

impl RenderJob {
    /// Job for `highlight`, selecting its captions from the absolute `track`.
    ///
    /// Without an output name, `reel_<start>_<end>_<random>.mp4` is used.
    pub fn new(
        source: impl Into<PathBuf>,
        highlight: &Highlight,
        track: &[CaptionSegment],
        output_dir: impl Into<PathBuf>,
        output_name: Option<String>,
    ) -> Self {
        let window = highlight.range();
        let output_name = output_name.unwrap_or_else(|| {
            let suffix = format!("{:08x}", rand::rng().random::<u32>());
            adhoc_output_filename(window.start, window.end, &suffix)
        });

        Self {
            source: source.into(),
            captions: captions_for_window(track, window),
            window,
            output_dir: output_dir.into(),
            output_name,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

/// Render one highlight to `job.output_path()`.
pub async fn render_highlight(
    engine: &dyn MediaEngine,
    job: &RenderJob,
    options: &RenderOptions,
) -> Result<PathBuf, RenderError> {
    let started = Instant::now();
    let result = run_stages(engine, job, options).await;

    match &result {
        Ok(path) => {
            let elapsed = started.elapsed().as_secs_f64();
            metrics::record_render_success(elapsed);
            info!(
                path = %path.display(),
                start = job.window.start,
                end = job.window.end,
                elapsed_secs = elapsed,
                "Reel rendered"
            );
        }
        Err(e) => metrics::record_render_failure(e.stage()),
    }
    result
}

async fn run_stages(
    engine: &dyn MediaEngine,
    job: &RenderJob,
    options: &RenderOptions,
) -> Result<PathBuf, RenderError> {
    let TimeRange { start, end } = job.window;

    // Extract
    let source = OwnedClip::new(engine, engine.open(&job.source).await.at(RenderStage::Extract)?);
    let source_info = source.info().at(RenderStage::Extract)?;
    if !(start >= 0.0 && end > start && end <= source_info.duration) {
        return Err(RenderError::new(
            RenderStage::Extract,
            MediaError::InvalidTimeRange {
                start,
                end,
                duration: source_info.duration,
            },
        ));
    }
    let trimmed = source.adopt(
        engine
            .trim(source.handle(), start, end)
            .await
            .at(RenderStage::Extract)?,
    );
    debug!(start, end, clip = %trimmed.handle(), "Extracted highlight");

    // Transform
    let plan = plan_transform(
        source_info.width,
        source_info.height,
        options.resize_method,
        options.aspect,
    )
    .at(RenderStage::Transform)?;

    let cropped = match plan.crop {
        Some(rect) => Some(
            trimmed.adopt(
                engine
                    .crop(trimmed.handle(), rect)
                    .await
                    .at(RenderStage::Transform)?,
            ),
        ),
        None => None,
    };
    let framed = cropped.as_ref().map_or(trimmed.handle(), OwnedClip::handle);
    let (width, height) = plan.scale;
    let resized = trimmed.adopt(
        engine
            .resize(framed, width, height)
            .await
            .at(RenderStage::Transform)?,
    );

    // Caption
    let finished = if options.add_captions && !job.captions.is_empty() {
        let pass = apply_captions(resized, &job.captions, &options.caption_style)
            .await
            .at(RenderStage::Caption)?;
        debug!(overlays = pass.overlays, skipped = pass.skipped, "Captions applied");
        pass.clip
    } else {
        resized
    };

    // Encode
    tokio::fs::create_dir_all(&job.output_dir)
        .await
        .map_err(MediaError::from)
        .at(RenderStage::Encode)?;
    let output = job.output_path();
    if let Err(e) = engine.encode(finished.handle(), &output, &options.profile).await {
        remove_partial(&output).await;
        return Err(RenderError::new(RenderStage::Encode, e));
    }

    Ok(output)
}

async fn remove_partial(output: &Path) {
    if tokio::fs::metadata(output).await.is_ok() {
        if let Err(e) = tokio::fs::remove_file(output).await {
            warn!(path = %output.display(), error = %e, "Failed to remove partial output");
        }
    }
}
