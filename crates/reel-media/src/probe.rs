//! Source inspection with `ffprobe`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::engine::ClipInfo;
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container does not report one.
const FALLBACK_FPS: f64 = 30.0;

/// What `ffprobe` reports about a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub has_audio: bool,
}

impl VideoInfo {
    /// Geometry and timing used by the clip primitives.
    pub fn clip_info(&self) -> ClipInfo {
        ClipInfo {
            duration: self.duration,
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// Subset of `ffprobe -print_format json -show_format -show_streams`.
#[derive(Debug, Deserialize)]
struct ProbeReport {
    format: ProbeContainer,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeContainer {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

impl ProbeReport {
    fn into_video_info(self) -> MediaResult<VideoInfo> {
        let has_audio = self.streams.iter().any(|s| s.codec_type == "audio");
        let video = self
            .streams
            .into_iter()
            .find(|s| s.codec_type == "video")
            .ok_or_else(|| MediaError::InvalidVideo("source has no video stream".to_string()))?;

        // Container duration wins; streams without one fall back to their own
        let duration = [self.format.duration.as_deref(), video.duration.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|d| d.parse::<f64>().ok())
            .find(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| MediaError::InvalidVideo("source duration is unknown or zero".to_string()))?;

        let fps = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .find_map(parse_frame_rate)
            .unwrap_or(FALLBACK_FPS);

        Ok(VideoInfo {
            duration,
            width: video.width.unwrap_or_default(),
            height: video.height.unwrap_or_default(),
            fps,
            codec: video.codec_name.unwrap_or_default(),
            has_audio,
        })
    }
}

/// Inspect a local source file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("could not inspect {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    serde_json::from_slice::<ProbeReport>(&output.stdout)?.into_video_info()
}

/// `"30000/1001"` or `"29.97"` to frames per second; `None` for `"0/0"` and junk.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok().filter(|d: &f64| *d > 0.0)?;
            num.parse::<f64>().ok()? / den
        }
        None => s.parse().ok()?,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}
