//! Building and running `ffmpeg` invocations.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{EncodeProgress, ProgressParser};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// FFmpeg log lines kept for failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `ffmpeg` invocation: a single input and a single output.
///
/// Options added with the seek/duration helpers land before `-i` so FFmpeg
/// seeks on the input; everything else applies to the output.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: String,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
    overwrite: bool,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::from_url(input.as_ref().to_string_lossy(), output)
    }

    /// Read from a URL or any other input FFmpeg understands.
    pub fn from_url(input: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.into(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
            overwrite: true,
        }
    }

    fn input_option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.before_input.push(flag.to_string());
        self.before_input.push(value.into());
        self
    }

    fn output_option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.after_input.push(flag.to_string());
        self.after_input.push(value.into());
        self
    }

    pub fn seek(self, seconds: f64) -> Self {
        self.input_option("-ss", format!("{:.3}", seconds))
    }

    pub fn duration(self, seconds: f64) -> Self {
        self.input_option("-t", format!("{:.3}", seconds))
    }

    pub fn video_filter(self, chain: impl Into<String>) -> Self {
        self.output_option("-vf", chain)
    }

    /// Copy every stream as-is.
    pub fn stream_copy(self) -> Self {
        self.output_option("-c", "copy")
    }

    pub fn audio_bitstream_filter(self, filter: impl Into<String>) -> Self {
        self.output_option("-bsf:a", filter)
    }

    /// Move the MP4 index to the front of the file.
    pub fn faststart(self) -> Self {
        self.output_option("-movflags", "+faststart")
    }

    /// Append raw output options, e.g. an encoding profile.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Fail instead of replacing an existing output.
    pub fn no_overwrite(mut self) -> Self {
        self.overwrite = false;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Full argument list, without the program name.
    pub fn to_args(&self) -> Vec<String> {
        let header = [
            if self.overwrite { "-y" } else { "-n" },
            "-v",
            "error",
            "-progress",
            "pipe:2",
        ];

        header
            .iter()
            .map(|s| s.to_string())
            .chain(self.before_input.iter().cloned())
            .chain(["-i".to_string(), self.input.clone()])
            .chain(self.after_input.iter().cloned())
            .chain(std::iter::once(self.output.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Executes [`FfmpegCommand`]s, optionally bounded by a timeout.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_observed(cmd, |_| {}).await
    }

    /// Run `cmd`, passing each progress snapshot to `observe`.
    ///
    /// On a non-zero exit the error carries the last lines FFmpeg logged.
    pub async fn run_observed<F>(&self, cmd: &FfmpegCommand, mut observe: F) -> MediaResult<()>
    where
        F: FnMut(EncodeProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.to_args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let mut child = Command::new(FFMPEG)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::FfmpegNotFound
                } else {
                    MediaError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr was not piped"))?;

        let log_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut parser = ProgressParser::new();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if ProgressParser::is_progress_line(&line) {
                    if let Some(snapshot) = parser.feed(&line) {
                        observe(snapshot);
                    }
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let outcome = self.wait(&mut child).await;
        let log_tail = log_task.await.unwrap_or_default();

        match outcome {
            Ok(Some(code)) => Err(MediaError::ffmpeg_failed(
                format!("ffmpeg exited with status {}", code),
                (!log_tail.is_empty()).then_some(log_tail),
                Some(code),
            )),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` on success, `Ok(Some(code))` on a failed exit.
    async fn wait(&self, child: &mut Child) -> MediaResult<Option<i32>> {
        let status = match self.timeout {
            None => child.wait().await?,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "ffmpeg timed out, killing it");
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill timed-out ffmpeg");
                    }
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
        };

        Ok((!status.success()).then(|| status.code().unwrap_or(-1)))
    }
}

/// Resolve `ffmpeg` on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which(FFMPEG).or(Err(MediaError::FfmpegNotFound))
}

/// Resolve `ffprobe` on `PATH`.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which(FFPROBE).or(Err(MediaError::FfprobeNotFound))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_trim_options_precede_input() {
        let args = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_filter("scale=1080:1920")
            .to_args();

        assert_eq!(&args[..5], &["-y", "-v", "error", "-progress", "pipe:2"]);
        assert_eq!(args[position(&args, "-ss") + 1], "10.000");
        assert_eq!(args[position(&args, "-t") + 1], "30.000");
        assert!(position(&args, "-ss") < position(&args, "-i"));
        assert!(position(&args, "-i") < position(&args, "-vf"));
        assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
    }

    #[test]
    fn test_remux_arguments() {
        let args = FfmpegCommand::from_url("https://cdn.example.com/a/master.m3u8", "/tmp/out.mp4")
            .stream_copy()
            .audio_bitstream_filter("aac_adtstoasc")
            .to_args();

        assert!(args
            .join(" ")
            .ends_with("-i https://cdn.example.com/a/master.m3u8 -c copy -bsf:a aac_adtstoasc /tmp/out.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_child() {
        let mut child = Command::new("sleep").arg("5").kill_on_drop(true).spawn().unwrap();
        let runner = FfmpegRunner::new().with_timeout(Duration::from_millis(50));

        let err = runner.wait(&mut child).await.unwrap_err();

        assert!(matches!(err, MediaError::Timeout(0)));
        // Killed and reaped
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_profile_and_faststart() {
        let args = FfmpegCommand::new("a.mp4", "b.mp4")
            .output_args(["-c:v", "libx264"])
            .faststart()
            .no_overwrite()
            .to_args();

        assert_eq!(args[0], "-n");
        assert!(args.join(" ").contains("-c:v libx264 -movflags +faststart b.mp4"));
    }
}
