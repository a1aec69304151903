//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reel_media::download::{DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_REMUX_TIMEOUT};
use reel_models::ResizeMethod;

/// Default TwelveLabs API base URL.
pub const DEFAULT_TWELVELABS_BASE_URL: &str = "https://api.twelvelabs.io/v1.3";

/// Video-understanding API settings.
#[derive(Clone)]
pub struct TwelveLabsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub index_id: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TwelveLabsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwelveLabsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("index_id", &self.index_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for TwelveLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_TWELVELABS_BASE_URL.to_string(),
            index_id: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for downloaded sources
    pub work_dir: PathBuf,
    /// Directory rendered reels are written to
    pub output_dir: PathBuf,
    /// How source frames are fitted to portrait
    pub resize_method: ResizeMethod,
    /// Burn captions into reels
    pub add_captions: bool,
    /// Highlights rendered concurrently within a batch
    pub max_parallel: usize,
    /// Font used for styled captions
    pub font_file: Option<String>,
    pub download_timeout: Duration,
    pub remux_timeout: Duration,
    /// Upper bound for one reel encode; unbounded when `None`
    pub encode_timeout: Option<Duration>,
    pub twelvelabs: TwelveLabsConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let work_dir = PathBuf::from("/tmp/reel");
        Self {
            output_dir: work_dir.join("reels"),
            work_dir,
            resize_method: ResizeMethod::Crop,
            add_captions: true,
            max_parallel: 1,
            font_file: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            remux_timeout: DEFAULT_REMUX_TIMEOUT,
            encode_timeout: None,
            twelvelabs: TwelveLabsConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source. Unset or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let work_dir = lookup("REEL_WORK_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);
        let output_dir = lookup("REEL_OUTPUT_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("reels"));

        Self {
            output_dir,
            work_dir,
            resize_method: parsed(&lookup, "REEL_RESIZE_METHOD").unwrap_or(defaults.resize_method),
            add_captions: lookup("REEL_ADD_CAPTIONS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.add_captions),
            max_parallel: parsed::<usize, _>(&lookup, "REEL_MAX_PARALLEL")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_parallel),
            font_file: lookup("REEL_FONT_FILE").filter(|s| !s.trim().is_empty()),
            download_timeout: parsed(&lookup, "REEL_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            remux_timeout: parsed(&lookup, "REEL_REMUX_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.remux_timeout),
            encode_timeout: parsed::<u64, _>(&lookup, "REEL_ENCODE_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            twelvelabs: TwelveLabsConfig {
                api_key: lookup("TWELVELABS_API_KEY").filter(|s| !s.trim().is_empty()),
                base_url: lookup("TWELVELABS_BASE_URL")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(defaults.twelvelabs.base_url),
                index_id: lookup("TWELVELABS_INDEX_ID").filter(|s| !s.trim().is_empty()),
                request_timeout: parsed(&lookup, "TWELVELABS_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.twelvelabs.request_timeout),
            },
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/reel"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reel/reels"));
        assert_eq!(config.resize_method, ResizeMethod::Crop);
        assert!(config.add_captions);
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.download_timeout, Duration::from_secs(300));
        assert_eq!(config.remux_timeout, Duration::from_secs(600));
        assert!(config.encode_timeout.is_none());
        assert_eq!(config.twelvelabs.base_url, DEFAULT_TWELVELABS_BASE_URL);
        assert!(config.twelvelabs.api_key.is_none());
    }

    #[test]
    fn test_reads_overrides() {
        let config = config_from(&[
            ("REEL_WORK_DIR", "/data/work"),
            ("REEL_RESIZE_METHOD", "Fit"),
            ("REEL_ADD_CAPTIONS", "off"),
            ("REEL_MAX_PARALLEL", "3"),
            ("REEL_FONT_FILE", "/fonts/Anton.ttf"),
            ("REEL_ENCODE_TIMEOUT_SECS", "900"),
            ("TWELVELABS_API_KEY", "tlk_123"),
            ("TWELVELABS_BASE_URL", "http://localhost:9000/v1.3/"),
        ]);
        assert_eq!(config.output_dir, PathBuf::from("/data/work/reels"));
        assert_eq!(config.resize_method, ResizeMethod::Fit);
        assert!(!config.add_captions);
        assert_eq!(config.max_parallel, 3);
        assert_eq!(config.font_file.as_deref(), Some("/fonts/Anton.ttf"));
        assert_eq!(config.encode_timeout, Some(Duration::from_secs(900)));
        assert_eq!(config.twelvelabs.api_key.as_deref(), Some("tlk_123"));
        assert_eq!(config.twelvelabs.base_url, "http://localhost:9000/v1.3");
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = config_from(&[
            ("REEL_RESIZE_METHOD", "stretch"),
            ("REEL_ADD_CAPTIONS", "maybe"),
            ("REEL_MAX_PARALLEL", "0"),
            ("REEL_DOWNLOAD_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(config.resize_method, ResizeMethod::Crop);
        assert!(config.add_captions);
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.download_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("TWELVELABS_API_KEY", "secret-key")]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
