//! Reel encoding profile.

use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_PRESET: &str = "medium";
/// Output frame rate of every reel
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_THREADS: u32 = 4;

/// Target profile every reel is encoded with.
///
/// Missing fields deserialize to the defaults, so a partial profile in a
/// config file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingProfile {
    pub codec: String,
    pub audio_codec: String,
    pub fps: u32,
    /// x264 speed/quality preset
    pub preset: String,
    pub threads: u32,
    /// Constant rate factor; encoder default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    /// e.g. `"128k"`; encoder default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            fps: DEFAULT_FPS,
            preset: DEFAULT_PRESET.into(),
            threads: DEFAULT_THREADS,
            crf: None,
            audio_bitrate: None,
        }
    }
}

impl EncodingProfile {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Output options for an FFmpeg encode.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut pairs: Vec<(&str, String)> = vec![
            ("-c:v", self.codec.clone()),
            ("-preset", self.preset.clone()),
        ];
        if let Some(crf) = self.crf {
            pairs.push(("-crf", crf.to_string()));
        }
        pairs.push(("-r", self.fps.to_string()));
        pairs.push(("-threads", self.threads.to_string()));
        pairs.push(("-c:a", self.audio_codec.clone()));
        if let Some(bitrate) = &self.audio_bitrate {
            pairs.push(("-b:a", bitrate.clone()));
        }

        pairs
            .into_iter()
            .flat_map(|(flag, value)| [flag.to_string(), value])
            .collect()
    }
}
