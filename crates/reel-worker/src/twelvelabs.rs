//! TwelveLabs video-understanding client.
//!
//! Only the calls the reel workflows need: index and video lookup (for the
//! stream URL), free-text analysis and the timestamped transcript.

use async_trait::async_trait;
use reel_models::CaptionSegment;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TwelveLabsConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::transcript::parse_caption_entries;

/// A video index of the account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    #[serde(rename(deserialize = "_id"), alias = "id")]
    pub id: String,
    #[serde(rename(deserialize = "index_name"), alias = "name", default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u64>,
}

/// An indexed video.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoDetails {
    pub id: String,
    pub filename: Option<String>,
    /// Duration in seconds as reported by the index
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// HLS manifest the source can be fetched from
    pub stream_url: Option<String>,
}

impl VideoDetails {
    /// Display name, falling back to `Video <id>`.
    pub fn display_name(&self) -> String {
        self.filename
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Video {}", self.id))
    }
}

/// Video-understanding operations used by the workflows.
#[async_trait]
pub trait VideoIntelligence: Send + Sync {
    /// Indexes of the account, one page at a time (1-based).
    async fn list_indexes(&self, page: u32) -> WorkerResult<Vec<IndexSummary>>;

    /// Look up a video in an index.
    async fn video_details(&self, index_id: &str, video_id: &str) -> WorkerResult<VideoDetails>;

    /// Videos of an index, one page at a time (1-based).
    async fn list_videos(&self, index_id: &str, page: u32) -> WorkerResult<Vec<VideoDetails>>;

    /// Ask a free-text question about a video.
    async fn analyze(&self, video_id: &str, prompt: &str) -> WorkerResult<String>;

    /// Timestamped transcript, empty when none is available.
    async fn transcription(&self, index_id: &str, video_id: &str) -> WorkerResult<Vec<CaptionSegment>>;
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    #[serde(rename = "_id", alias = "id", default)]
    id: String,
    #[serde(default)]
    system_metadata: Option<SystemMetadata>,
    #[serde(default)]
    hls: Option<HlsInfo>,
}

#[derive(Debug, Deserialize)]
struct SystemMetadata {
    filename: Option<String>,
    duration: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct HlsInfo {
    video_url: Option<String>,
}

impl From<VideoResponse> for VideoDetails {
    fn from(video: VideoResponse) -> Self {
        let meta = video.system_metadata;
        Self {
            id: video.id,
            filename: meta.as_ref().and_then(|m| m.filename.clone()),
            duration: meta.as_ref().and_then(|m| m.duration),
            width: meta.as_ref().and_then(|m| m.width),
            height: meta.as_ref().and_then(|m| m.height),
            stream_url: video.hls.and_then(|h| h.video_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    video_id: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    data: Option<String>,
}

/// REST client for the TwelveLabs API.
pub struct TwelveLabsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl TwelveLabsClient {
    /// Create a client from configuration. Requires an API key.
    pub fn new(config: &TwelveLabsConfig) -> WorkerResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WorkerError::config_error("TWELVELABS_API_KEY not set"))?;

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> String {
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/{}", self.base_url, path.join("/"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json")
    }
}

async fn api_failure(what: &str, response: reqwest::Response) -> WorkerError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    WorkerError::ai_failed(format!("{} returned {}: {}", what, status, body))
}

#[async_trait]
impl VideoIntelligence for TwelveLabsClient {
    async fn video_details(&self, index_id: &str, video_id: &str) -> WorkerResult<VideoDetails> {
        let url = self.url(&["indexes", index_id, "videos", video_id]);
        debug!(url = %url, "Fetching video details");

        let response = self
            .authorized(self.client.get(&url).query(&[("embed", "false")]))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(WorkerError::VideoNotFound {
                index_id: index_id.to_string(),
                video_id: video_id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(api_failure("video details", response).await);
        }

        let mut details: VideoDetails = response.json::<VideoResponse>().await?.into();
        if details.id.is_empty() {
            details.id = video_id.to_string();
        }
        info!(
            video_id = %details.id,
            name = %details.display_name(),
            has_stream = details.stream_url.is_some(),
            "Video details retrieved"
        );
        Ok(details)
    }

    async fn list_indexes(&self, page: u32) -> WorkerResult<Vec<IndexSummary>> {
        let url = self.url(&["indexes"]);
        let response = self
            .authorized(self.client.get(&url).query(&[("page", page.max(1))]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_failure("index listing", response).await);
        }

        let listing: ListResponse<IndexSummary> = response.json().await?;
        debug!(indexes = listing.data.len(), "Indexes listed");
        Ok(listing.data)
    }

    async fn list_videos(&self, index_id: &str, page: u32) -> WorkerResult<Vec<VideoDetails>> {
        let url = self.url(&["indexes", index_id, "videos"]);
        let response = self
            .authorized(self.client.get(&url).query(&[("page", page.max(1))]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_failure("video listing", response).await);
        }

        let listing: ListResponse<VideoResponse> = response.json().await?;
        Ok(listing.data.into_iter().map(VideoDetails::from).collect())
    }

    async fn analyze(&self, video_id: &str, prompt: &str) -> WorkerResult<String> {
        let url = self.url(&["analyze"]);
        info!(video_id = %video_id, prompt_len = prompt.len(), "Requesting video analysis");

        let response = self
            .authorized(self.client.post(&url))
            .json(&AnalyzeRequest {
                video_id,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_failure("analyze", response).await);
        }

        let analysis: AnalyzeResponse = response.json().await?;
        analysis
            .data
            .ok_or_else(|| WorkerError::ai_failed("analyze response has no text"))
    }

    async fn transcription(&self, index_id: &str, video_id: &str) -> WorkerResult<Vec<CaptionSegment>> {
        let url = self.url(&["indexes", index_id, "videos", video_id, "text"]);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            warn!(
                video_id = %video_id,
                status = %response.status(),
                "Transcription unavailable"
            );
            return Ok(Vec::new());
        }

        let listing: ListResponse<serde_json::Value> = response.json().await?;
        let track = parse_caption_entries(listing.data);
        info!(video_id = %video_id, segments = track.len(), "Transcription retrieved");
        Ok(track)
    }
}
