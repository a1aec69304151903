//! Batch render pipeline.
//!
//! Renders every highlight of a source into `reel_<index>_<slug>.mp4`. A
//! failing highlight is logged and left out; only preconditions shared by
//! all items (missing source, unusable output directory) fail the batch.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use reel_media::{MediaEngine, MediaError};
use reel_models::{batch_output_filename, CaptionSegment, Highlight};
use serde::Serialize;
use tracing::Instrument;

use crate::error::{RenderError, WorkerError, WorkerResult};
use crate::logging::BatchLogger;
use crate::metrics;
use crate::pipeline::highlight::{render_highlight, RenderJob, RenderOptions};

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub render: RenderOptions,
    /// Highlights rendered concurrently. Output order is unaffected.
    pub max_parallel: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            max_parallel: 1,
        }
    }
}

/// Outcome of one highlight.
#[derive(Debug)]
pub struct BatchItem {
    /// 1-based position in the input
    pub index: usize,
    pub title: String,
    pub start: f64,
    pub end: f64,
    pub result: Result<PathBuf, RenderError>,
}

/// Per-item outcomes, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Rendered paths, in input order.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().ok().cloned())
            .collect()
    }

    pub fn attempted(&self) -> usize {
        self.items.len()
    }

    pub fn produced(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.result.is_err())
    }
}

/// Serializable view of a [`BatchItem`].
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub index: usize,
    pub title: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<crate::error::RenderStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchItem> for ItemSummary {
    fn from(item: &BatchItem) -> Self {
        let (path, stage, error) = match &item.result {
            Ok(path) => (Some(path.clone()), None, None),
            Err(e) => (None, Some(e.stage()), Some(e.source.to_string())),
        };
        Self {
            index: item.index,
            title: item.title.clone(),
            start: item.start,
            end: item.end,
            path,
            stage,
            error,
        }
    }
}

/// Check what every item depends on before rendering anything.
async fn check_preconditions(source: &Path, output_dir: &Path) -> WorkerResult<()> {
    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(WorkerError::precondition(format!(
                "source is not a file: {}",
                source.display()
            )))
        }
        Err(_) => return Err(MediaError::FileNotFound(source.to_path_buf()).into()),
    }

    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        WorkerError::precondition(format!(
            "output directory {} is not usable: {}",
            output_dir.display(),
            e
        ))
    })
}

/// Render every highlight of `source` into `output_dir`.
///
/// `captions` is the full absolute-time track; each highlight selects its
/// own window from it.
pub async fn render_batch(
    engine: &dyn MediaEngine,
    source: &Path,
    highlights: &[Highlight],
    captions: &[CaptionSegment],
    output_dir: &Path,
    options: &BatchOptions,
    logger: &BatchLogger,
) -> WorkerResult<BatchReport> {
    check_preconditions(source, output_dir).await?;

    let span = logger.create_span();
    async move {
        logger.log_start(source, highlights.len());

        let items: Vec<BatchItem> = stream::iter(highlights.iter().enumerate())
            .map(|(i, highlight)| {
                let index = i + 1;
                let job = RenderJob::new(
                    source,
                    highlight,
                    captions,
                    output_dir,
                    Some(batch_output_filename(index, highlight.title())),
                );
                async move {
                    let result = render_highlight(engine, &job, &options.render).await;
                    match &result {
                        Ok(path) => logger.log_item_rendered(index, highlight.title(), path),
                        Err(e) => logger.log_item_failed(index, highlight.title(), e),
                    }
                    BatchItem {
                        index,
                        title: highlight.title().to_string(),
                        start: highlight.start(),
                        end: highlight.end(),
                        result,
                    }
                }
            })
            .buffered(options.max_parallel.max(1))
            .collect()
            .await;

        let report = BatchReport { items };
        metrics::record_batch(report.produced(), report.attempted());
        logger.log_completion(report.produced(), report.attempted());
        Ok(report)
    }
    .instrument(span)
    .await
}
