//! Reel worker binary.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::{FfmpegEngine, MediaEngine, MemoryEngine};
use reel_models::{CaptionSegment, CaptionStyle, Highlight, ResizeMethod};
use reel_worker::analysis::parse_highlights_input;
use reel_worker::transcript::load_caption_track;
use reel_worker::{
    process_indexed_video, process_local, process_single, BatchOptions, IndexedVideoRequest,
    LocalRequest, RenderOptions, TwelveLabsClient, VideoIntelligence, WorkerConfig,
    WorkflowContext, WorkflowReport,
};

#[derive(Parser)]
#[command(name = "reel-worker", version, about = "Turn video highlights into portrait reels")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render highlights of a local or remote source
    Render {
        /// Local path, file:// URL, HTTP(S) URL or .m3u8 manifest
        #[arg(long)]
        source: String,
        /// JSON list of {title,start,end} or free analysis text
        #[arg(long)]
        highlights: PathBuf,
        /// JSON list of {text,start,end} in source time
        #[arg(long)]
        captions: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Render a single time range
    RenderOne {
        #[arg(long)]
        source: String,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        captions: Option<PathBuf>,
        /// Output file name (generated when omitted)
        #[arg(long)]
        output_name: Option<String>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Select an indexed video, find highlights and render them
    ProcessIndexed {
        #[arg(long)]
        video_id: String,
        #[arg(long, env = "TWELVELABS_INDEX_ID")]
        index_id: String,
        /// Analysis prompt (default asks for the top 5 moments)
        #[arg(long)]
        prompt: Option<String>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// List the video indexes of the account
    ListIndexes {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List videos of an index
    ListVideos {
        #[arg(long, env = "TWELVELABS_INDEX_ID")]
        index_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print the highlights found in an analysis or highlights file
    ParseHighlights {
        /// File to read; `-` for stdin
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CaptionPreset {
    /// Yellow text with a black outline
    Outline,
    /// White text on a black box
    Boxed,
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// crop or fit
    #[arg(long)]
    resize_method: Option<ResizeMethod>,
    /// Do not burn in captions
    #[arg(long)]
    no_captions: bool,
    #[arg(long, value_enum, default_value = "outline")]
    caption_preset: CaptionPreset,
    #[arg(long)]
    font_file: Option<String>,
    #[arg(long)]
    max_parallel: Option<usize>,
    /// Plan renders without running FFmpeg; prints the encode plan
    #[arg(long)]
    dry_run: bool,
}

impl RenderArgs {
    fn apply(&self, config: &mut WorkerConfig) {
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(method) = self.resize_method {
            config.resize_method = method;
        }
        if self.no_captions {
            config.add_captions = false;
        }
        if let Some(font) = &self.font_file {
            config.font_file = Some(font.clone());
        }
        if let Some(n) = self.max_parallel {
            config.max_parallel = n.max(1);
        }
    }

    fn batch_options(&self, config: &WorkerConfig) -> BatchOptions {
        let mut style = match self.caption_preset {
            CaptionPreset::Outline => CaptionStyle::default(),
            CaptionPreset::Boxed => CaptionStyle::boxed(),
        };
        if let Some(font) = &config.font_file {
            style = style.with_font_file(font.clone());
        }

        BatchOptions {
            render: RenderOptions::new(config.resize_method, config.add_captions).with_caption_style(style),
            max_parallel: config.max_parallel,
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?
        .add_directive("reel_worker=info".parse()?)
        .add_directive("reel_media=info".parse()?);

    // Logs go to stderr; stdout carries the JSON report
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut body).await?;
        Ok(body)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}

async fn load_captions(path: Option<&Path>) -> anyhow::Result<Vec<CaptionSegment>> {
    match path {
        Some(path) => Ok(load_caption_track(path).await?),
        None => Ok(Vec::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs a workflow on the FFmpeg engine, or on the memory engine for dry runs.
struct Engines {
    ffmpeg: FfmpegEngine,
    memory: MemoryEngine,
    dry_run: bool,
}

impl Engines {
    fn new(config: &WorkerConfig, dry_run: bool) -> Self {
        let mut ffmpeg = FfmpegEngine::new().with_scratch_dir(&config.work_dir);
        if let Some(timeout) = config.encode_timeout {
            ffmpeg = ffmpeg.with_encode_timeout(timeout);
        }
        Self {
            ffmpeg,
            memory: MemoryEngine::new(),
            dry_run,
        }
    }

    fn engine(&self) -> &dyn MediaEngine {
        if self.dry_run {
            &self.memory
        } else {
            &self.ffmpeg
        }
    }

    fn report(&self, report: &WorkflowReport) -> anyhow::Result<()> {
        if self.dry_run {
            print_json(&serde_json::json!({
                "report": report,
                "plan": self.memory.encoded(),
            }))
        } else {
            print_json(report)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = WorkerConfig::from_env();
    let http = reqwest::Client::new();

    match cli.command {
        Command::ParseHighlights { input } => {
            let highlights = parse_highlights_input(&read_input(&input).await?)?;
            print_json(&highlights)?;
            Ok(!highlights.is_empty())
        }
        Command::ListIndexes { page } => {
            let client = TwelveLabsClient::new(&config.twelvelabs)?;
            let indexes = client.list_indexes(page).await?;
            print_json(&indexes)?;
            Ok(true)
        }
        Command::ListVideos { index_id, page } => {
            let client = TwelveLabsClient::new(&config.twelvelabs)?;
            let videos = client.list_videos(&index_id, page).await?;
            print_json(&videos)?;
            Ok(true)
        }
        Command::Render {
            source,
            highlights,
            captions,
            render,
        } => {
            render.apply(&mut config);
            let highlights = parse_highlights_input(&read_input(&highlights).await?)?;
            let captions = load_captions(captions.as_deref()).await?;
            prepare_dirs(&config).await?;

            let engines = Engines::new(&config, render.dry_run);
            let ctx = WorkflowContext {
                engine: engines.engine(),
                http: &http,
                config: &config,
                options: render.batch_options(&config),
            };
            let report = process_local(
                &ctx,
                &LocalRequest {
                    source,
                    highlights,
                    captions,
                },
            )
            .await?;
            engines.report(&report)?;
            Ok(report.success)
        }
        Command::RenderOne {
            source,
            start,
            end,
            title,
            captions,
            output_name,
            render,
        } => {
            render.apply(&mut config);
            let highlight = Highlight::new(title, start, end)?;
            let captions = load_captions(captions.as_deref()).await?;
            prepare_dirs(&config).await?;

            let engines = Engines::new(&config, render.dry_run);
            let ctx = WorkflowContext {
                engine: engines.engine(),
                http: &http,
                config: &config,
                options: render.batch_options(&config),
            };
            let report = process_single(&ctx, &source, &highlight, &captions, output_name).await?;
            engines.report(&report)?;
            Ok(report.success)
        }
        Command::ProcessIndexed {
            video_id,
            index_id,
            prompt,
            render,
        } => {
            render.apply(&mut config);
            let client = TwelveLabsClient::new(&config.twelvelabs)?;
            prepare_dirs(&config).await?;

            let engines = Engines::new(&config, render.dry_run);
            let ctx = WorkflowContext {
                engine: engines.engine(),
                http: &http,
                config: &config,
                options: render.batch_options(&config),
            };
            let request = IndexedVideoRequest {
                index_id,
                video_id,
                prompt,
            };
            let report = process_indexed_video(&ctx, &client, &request).await?;
            engines.report(&report)?;
            Ok(report.success)
        }
    }
}

async fn prepare_dirs(config: &WorkerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    info!("Starting reel-worker");

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => {
            error!("Workflow produced no output");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Workflow failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
