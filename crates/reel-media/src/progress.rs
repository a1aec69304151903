//! Encode progress reported by `ffmpeg -progress`.
//!
//! FFmpeg writes `key=value` lines and closes each block with a
//! `progress=continue|end` line. [`ProgressParser`] folds those lines into an
//! [`EncodeProgress`] snapshot and hands it back once per block.

use serde::Serialize;

/// Keys FFmpeg writes to `-progress` output besides `stream_*` quality keys.
const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Snapshot of a running encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EncodeProgress {
    pub frame: u64,
    pub fps: f64,
    /// Seconds of output written so far
    pub written_secs: f64,
    /// Realtime multiple; `None` while FFmpeg reports `N/A`
    pub speed: Option<f64>,
    pub finished: bool,
}

impl EncodeProgress {
    /// Share of a `total_secs` clip already written, in percent.
    pub fn percent_of(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.written_secs / total_secs * 100.0).clamp(0.0, 100.0)
    }

    /// Wall-clock seconds left for a `total_secs` clip at the current speed.
    pub fn eta_secs(&self, total_secs: f64) -> Option<f64> {
        let speed = self.speed.filter(|s| *s > 0.0)?;
        if self.written_secs <= 0.0 {
            return None;
        }
        Some((total_secs - self.written_secs).max(0.0) / speed)
    }
}

/// Accumulates `-progress` lines into snapshots.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: EncodeProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` belongs to the `-progress` stream rather than FFmpeg's log.
    pub fn is_progress_line(line: &str) -> bool {
        match line.trim().split_once('=') {
            Some((key, _)) => PROGRESS_KEYS.contains(&key) || key.starts_with("stream_"),
            None => false,
        }
    }

    /// Feed one line; returns a snapshot when the line closes a block.
    pub fn feed(&mut self, line: &str) -> Option<EncodeProgress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            // Modern FFmpeg reports both in microseconds
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.written_secs = us.max(0) as f64 / 1_000_000.0;
                }
            }
            "frame" => self.current.frame = value.parse().unwrap_or(self.current.frame),
            "fps" => self.current.fps = value.parse().unwrap_or(self.current.fps),
            "speed" => {
                self.current.speed = value
                    .strip_suffix('x')
                    .and_then(|s| s.trim().parse().ok());
            }
            "progress" => {
                self.current.finished = value == "end";
                return Some(self.current.clone());
            }
            _ => {}
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_yields_snapshot() {
        let mut parser = ProgressParser::new();

        assert!(parser.feed("frame=250").is_none());
        assert!(parser.feed("out_time_us=5000000").is_none());
        assert!(parser.feed("speed=2.0x").is_none());
        let snapshot = parser.feed("progress=continue").unwrap();

        assert_eq!(snapshot.frame, 250);
        assert!((snapshot.written_secs - 5.0).abs() < 1e-9);
        assert!((snapshot.percent_of(10.0) - 50.0).abs() < 1e-9);
        assert!((snapshot.eta_secs(10.0).unwrap() - 2.5).abs() < 1e-9);
        assert!(!snapshot.finished);

        parser.feed("speed=N/A");
        let last = parser.feed("progress=end").unwrap();
        assert!(last.finished);
        assert!(last.speed.is_none());
        assert!(last.eta_secs(10.0).is_none());
    }

    #[test]
    fn test_percent_is_clamped() {
        let progress = EncodeProgress {
            written_secs: 12.0,
            ..Default::default()
        };
        assert_eq!(progress.percent_of(10.0), 100.0);
        assert_eq!(progress.percent_of(0.0), 0.0);
    }

    #[test]
    fn test_log_lines_are_not_progress() {
        assert!(ProgressParser::is_progress_line("frame=120"));
        assert!(ProgressParser::is_progress_line("stream_0_0_q=28.0"));
        assert!(!ProgressParser::is_progress_line("[h264 @ 0x55] error while decoding MB 1 2"));
        assert!(!ProgressParser::is_progress_line("Invalid data found when processing input"));
        assert!(!ProgressParser::is_progress_line("key=value"));
    }
}
