//! End-to-end reel workflows.
//!
//! Both workflows acquire a source, decide the highlights and caption track,
//! run the batch pipeline and summarize the outcome in a [`WorkflowReport`].

use std::path::{Path, PathBuf};

use reel_media::{acquire_source, classify_source, FetchOptions, MediaEngine, SourceKind};
use reel_models::{CaptionSegment, Highlight};
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{parse_highlights, DEFAULT_HIGHLIGHT_PROMPT};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::BatchLogger;
use crate::metrics;
use crate::pipeline::{
    render_batch, render_highlight, BatchItem, BatchOptions, BatchReport, ItemSummary, RenderJob,
};
use crate::transcript::resolve_caption_track;
use crate::twelvelabs::VideoIntelligence;

/// Summary of a workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    /// At least one reel was produced
    pub success: bool,
    pub workflow: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_name: Option<String>,
    pub output_dir: PathBuf,
    pub highlights_count: usize,
    pub captions_count: usize,
    pub attempted: usize,
    pub produced: usize,
    pub items: Vec<ItemSummary>,
}

impl WorkflowReport {
    fn from_batch(workflow: &str, output_dir: &Path, captions_count: usize, batch: &BatchReport) -> Self {
        Self {
            success: batch.produced() > 0,
            workflow: workflow.to_string(),
            video_id: None,
            video_name: None,
            output_dir: output_dir.to_path_buf(),
            highlights_count: batch.attempted(),
            captions_count,
            attempted: batch.attempted(),
            produced: batch.produced(),
            items: batch.items.iter().map(ItemSummary::from).collect(),
        }
    }
}

/// Select an indexed video and turn it into reels.
#[derive(Debug, Clone)]
pub struct IndexedVideoRequest {
    pub index_id: String,
    pub video_id: String,
    /// Analysis prompt; the default highlight prompt when `None`
    pub prompt: Option<String>,
}

/// Reels from a caller-supplied source and highlights.
#[derive(Debug, Clone)]
pub struct LocalRequest {
    /// Local path, `file://` URL, HTTP(S) URL or HLS manifest
    pub source: String,
    pub highlights: Vec<Highlight>,
    /// Absolute-time caption track
    pub captions: Vec<CaptionSegment>,
}

/// Shared workflow dependencies.
pub struct WorkflowContext<'a> {
    pub engine: &'a dyn MediaEngine,
    pub http: &'a reqwest::Client,
    pub config: &'a WorkerConfig,
    pub options: BatchOptions,
}

impl WorkflowContext<'_> {
    fn fetch_options(&self) -> FetchOptions {
        let mut opts = FetchOptions::new(&self.config.work_dir);
        opts.download_timeout = self.config.download_timeout;
        opts.remux_timeout = self.config.remux_timeout;
        opts
    }

    /// Local path of `source`, and whether it was fetched for this run.
    async fn acquire(&self, source: &str) -> WorkerResult<(PathBuf, bool)> {
        let kind = classify_source(source)?;
        let downloaded = !matches!(kind, SourceKind::Local(_));
        let path = acquire_source(self.http, source, &self.fetch_options()).await?;
        metrics::record_source_acquired(match kind {
            SourceKind::Local(_) => "local",
            SourceKind::Hls(_) => "hls",
            SourceKind::Http(_) => "http",
        });
        Ok((path, downloaded))
    }

    async fn run_batch(
        &self,
        source: &Path,
        highlights: &[Highlight],
        captions: &[CaptionSegment],
        logger: &BatchLogger,
    ) -> WorkerResult<BatchReport> {
        render_batch(
            self.engine,
            source,
            highlights,
            captions,
            &self.config.output_dir,
            &self.options,
            logger,
        )
        .await
    }
}

async fn discard_download(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove downloaded source");
    }
}

/// Look up an indexed video, find its highlights and render them.
///
/// Steps: video details (stream URL), highlight analysis, transcript (with
/// highlight-title fallback), source download, batch render, cleanup.
pub async fn process_indexed_video(
    ctx: &WorkflowContext<'_>,
    intelligence: &dyn VideoIntelligence,
    request: &IndexedVideoRequest,
) -> WorkerResult<WorkflowReport> {
    let logger = BatchLogger::for_operation("process_indexed");
    logger.log_progress(&format!("selecting video {} from index {}", request.video_id, request.index_id));

    let details = intelligence
        .video_details(&request.index_id, &request.video_id)
        .await?;
    let stream_url = details
        .stream_url
        .clone()
        .ok_or_else(|| WorkerError::precondition(format!("no stream URL for video {}", details.id)))?;

    let prompt = request.prompt.as_deref().unwrap_or(DEFAULT_HIGHLIGHT_PROMPT);
    let analysis = intelligence.analyze(&request.video_id, prompt).await?;
    let highlights = parse_highlights(&analysis);
    if highlights.is_empty() {
        return Err(WorkerError::NoHighlights(format!(
            "analysis of video {} contained no time ranges",
            request.video_id
        )));
    }
    logger.log_progress(&format!("{} highlights found", highlights.len()));

    let add_captions = ctx.options.render.add_captions;
    let fetched = if add_captions {
        intelligence
            .transcription(&request.index_id, &request.video_id)
            .await
            .unwrap_or_else(|e| {
                logger.log_warning(&format!("transcription failed: {}", e));
                Vec::new()
            })
    } else {
        Vec::new()
    };
    let captions = resolve_caption_track(fetched, &highlights, add_captions);

    let (source, downloaded) = ctx.acquire(&stream_url).await?;
    let batch = ctx.run_batch(&source, &highlights, &captions, &logger).await;
    if downloaded {
        discard_download(&source).await;
    }
    let batch = batch?;

    let mut report = WorkflowReport::from_batch("process_indexed", &ctx.config.output_dir, captions.len(), &batch);
    report.video_id = Some(details.id.clone());
    report.video_name = Some(details.display_name());
    info!(
        video_id = %details.id,
        produced = report.produced,
        attempted = report.attempted,
        "Indexed video processed"
    );
    Ok(report)
}

/// Render caller-supplied highlights of a local or remote source.
///
/// The caption track is used as given; nothing is synthesized.
pub async fn process_local(ctx: &WorkflowContext<'_>, request: &LocalRequest) -> WorkerResult<WorkflowReport> {
    if request.highlights.is_empty() {
        return Err(WorkerError::NoHighlights("no highlights supplied".to_string()));
    }

    let logger = BatchLogger::for_operation("render");
    let captions: &[CaptionSegment] = if ctx.options.render.add_captions {
        &request.captions
    } else {
        &[]
    };

    let (source, downloaded) = ctx.acquire(&request.source).await?;
    let batch = ctx
        .run_batch(&source, &request.highlights, captions, &logger)
        .await;
    if downloaded {
        discard_download(&source).await;
    }
    let batch = batch?;

    Ok(WorkflowReport::from_batch(
        "render",
        &ctx.config.output_dir,
        captions.len(),
        &batch,
    ))
}

/// Render a single ad-hoc highlight.
///
/// Without `output_name` the reel is named `reel_<start>_<end>_<random>.mp4`.
/// The caption track is absolute-time, like the batch track.
pub async fn process_single(
    ctx: &WorkflowContext<'_>,
    source: &str,
    highlight: &Highlight,
    captions: &[CaptionSegment],
    output_name: Option<String>,
) -> WorkerResult<WorkflowReport> {
    tokio::fs::create_dir_all(&ctx.config.output_dir).await?;
    let (path, downloaded) = ctx.acquire(source).await?;

    let track: &[CaptionSegment] = if ctx.options.render.add_captions {
        captions
    } else {
        &[]
    };
    let job = RenderJob::new(&path, highlight, track, &ctx.config.output_dir, output_name);
    let result = render_highlight(ctx.engine, &job, &ctx.options.render).await;
    if downloaded {
        discard_download(&path).await;
    }

    if let Err(e) = &result {
        warn!(stage = %e.stage(), error = %e, "Ad-hoc render failed");
    }

    let batch = BatchReport {
        items: vec![BatchItem {
            index: 1,
            title: highlight.title().to_string(),
            start: highlight.start(),
            end: highlight.end(),
            result,
        }],
    };
    Ok(WorkflowReport::from_batch(
        "render_one",
        &ctx.config.output_dir,
        job.captions.len(),
        &batch,
    ))
}
