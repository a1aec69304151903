//! Source acquisition.
//!
//! Fetches a source video into local storage. Adaptive-streaming manifests
//! (`.m3u8`) are remuxed by FFmpeg without re-encoding; anything else over
//! HTTP is streamed to disk in chunks. Local paths are used in place.

use futures_util::StreamExt;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default HTTP download timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// Default HLS remux timeout.
pub const DEFAULT_REMUX_TIMEOUT: Duration = Duration::from_secs(600);

/// Where a source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Already on disk
    Local(PathBuf),
    /// Adaptive-streaming manifest
    Hls(String),
    /// Plain HTTP(S) file
    Http(String),
}

/// Classify a source string.
pub fn classify_source(source: &str) -> MediaResult<SourceKind> {
    match Url::parse(source) {
        Ok(url) => match url.scheme() {
            "file" => url
                .to_file_path()
                .map(SourceKind::Local)
                .map_err(|_| MediaError::download_failed(format!("invalid file url: {}", source))),
            "http" | "https" => {
                if source.to_lowercase().contains(".m3u8") {
                    Ok(SourceKind::Hls(source.to_string()))
                } else {
                    Ok(SourceKind::Http(source.to_string()))
                }
            }
            // Windows drive letters parse as a one-letter scheme
            scheme if scheme.len() == 1 => Ok(SourceKind::Local(PathBuf::from(source))),
            scheme => Err(MediaError::download_failed(format!(
                "unsupported source scheme: {}",
                scheme
            ))),
        },
        Err(_) => Ok(SourceKind::Local(PathBuf::from(source))),
    }
}

/// Options for [`acquire_source`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Directory for generated output names
    pub work_dir: PathBuf,
    /// Explicit output path; generated when `None`
    pub output: Option<PathBuf>,
    /// Replace an existing output file
    pub overwrite: bool,
    pub download_timeout: Duration,
    pub remux_timeout: Duration,
}

impl FetchOptions {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output: None,
            overwrite: false,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            remux_timeout: DEFAULT_REMUX_TIMEOUT,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// `video_<16 hex>.mp4` inside `work_dir`.
pub fn default_output_path(work_dir: &Path) -> PathBuf {
    let suffix: u64 = rand::rng().random();
    work_dir.join(format!("video_{:016x}.mp4", suffix))
}

/// Fetch `source` and return the local path of the video.
pub async fn acquire_source(
    client: &reqwest::Client,
    source: &str,
    opts: &FetchOptions,
) -> MediaResult<PathBuf> {
    let (url, is_hls) = match classify_source(source)? {
        SourceKind::Local(path) => {
            if !path.is_file() {
                return Err(MediaError::FileNotFound(path));
            }
            info!(path = %path.display(), "Using local source");
            return Ok(path);
        }
        SourceKind::Hls(url) => (url, true),
        SourceKind::Http(url) => (url, false),
    };

    let output = match &opts.output {
        Some(path) => path.clone(),
        None => default_output_path(&opts.work_dir),
    };
    prepare_output(&output, opts.overwrite).await?;

    let result = if is_hls {
        remux_hls(&url, &output, opts.remux_timeout).await
    } else {
        download_http(client, &url, &output, opts.download_timeout).await
    };

    if result.is_err() && output.exists() {
        if let Err(e) = fs::remove_file(&output).await {
            warn!(path = %output.display(), error = %e, "Failed to remove partial download");
        }
    }

    result.map(|_| output)
}

/// Refuse to clobber an existing file unless asked to, and make sure the
/// parent directory exists.
async fn prepare_output(output: &Path, overwrite: bool) -> MediaResult<()> {
    if output.exists() {
        if !overwrite {
            return Err(MediaError::OutputExists(output.to_path_buf()));
        }
        fs::remove_file(output).await?;
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Copy the streams of an HLS manifest into `output` without re-encoding.
pub async fn remux_hls(url: &str, output: &Path, timeout: Duration) -> MediaResult<()> {
    check_ffmpeg()?;

    info!(url = %url, output = %output.display(), "Remuxing HLS stream");

    let cmd = FfmpegCommand::from_url(url, output)
        .stream_copy()
        .audio_bitstream_filter("aac_adtstoasc");
    FfmpegRunner::new()
        .with_timeout(timeout)
        .run(&cmd)
        .await?;

    let size = fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(MediaError::download_failed(format!(
            "HLS remux produced no output at {}",
            output.display()
        )));
    }

    info!(output = %output.display(), size_mb = size as f64 / (1024.0 * 1024.0), "HLS remux complete");
    Ok(())
}

/// Stream an HTTP response body into `output`.
pub async fn download_http(
    client: &reqwest::Client,
    url: &str,
    output: &Path,
    timeout: Duration,
) -> MediaResult<()> {
    info!(url = %url, output = %output.display(), "Downloading source");

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    let mut file = fs::File::create(output).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed(format!("empty response body from {}", url)));
    }

    info!(output = %output.display(), size_mb = written as f64 / (1024.0 * 1024.0), "Download complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_source() {
        assert_eq!(
            classify_source("https://cdn.example.com/v/master.m3u8?token=1").unwrap(),
            SourceKind::Hls("https://cdn.example.com/v/master.m3u8?token=1".to_string())
        );
        assert!(matches!(
            classify_source("https://cdn.example.com/v/video.mp4").unwrap(),
            SourceKind::Http(_)
        ));
        assert_eq!(
            classify_source("/data/in.mp4").unwrap(),
            SourceKind::Local(PathBuf::from("/data/in.mp4"))
        );
        assert_eq!(
            classify_source("file:///data/in.mp4").unwrap(),
            SourceKind::Local(PathBuf::from("/data/in.mp4"))
        );
        assert!(classify_source("ftp://example.com/a.mp4").is_err());
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("/tmp/reel"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("video_"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(name.len(), "video_".len() + 16 + ".mp4".len());
        assert_eq!(path.parent().unwrap(), Path::new("/tmp/reel"));
    }

    #[tokio::test]
    async fn test_prepare_output_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("video.mp4");
        std::fs::write(&existing, b"data").unwrap();

        assert!(matches!(
            prepare_output(&existing, false).await,
            Err(MediaError::OutputExists(_))
        ));
        assert!(existing.exists());

        prepare_output(&existing, true).await.unwrap();
        assert!(!existing.exists());
    }
}
