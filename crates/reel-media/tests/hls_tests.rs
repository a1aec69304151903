//! HLS source handling without an FFmpeg install.
//!
//! Every test in this binary runs with an empty `PATH`.

use std::sync::Once;

use reel_media::{acquire_source, check_ffmpeg, classify_source, FetchOptions, MediaError, SourceKind};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn without_tools() {
    static CLEAR: Once = Once::new();
    CLEAR.call_once(|| std::env::set_var("PATH", ""));
}

#[test]
fn test_manifest_urls_are_hls() {
    for url in [
        "https://cdn.example.com/v/master.m3u8",
        "https://cdn.example.com/v/MASTER.M3U8",
        "http://cdn.example.com/v/index.m3u8?token=abc&exp=1",
    ] {
        assert_eq!(classify_source(url).unwrap(), SourceKind::Hls(url.to_string()), "{url}");
    }
}

#[tokio::test]
async fn test_hls_source_requires_ffmpeg() {
    without_tools();
    assert!(matches!(check_ffmpeg(), Err(MediaError::FfmpegNotFound)));

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/v/master.m3u8", server.uri());

    let err = acquire_source(&reqwest::Client::new(), &url, &FetchOptions::new(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::FfmpegNotFound));
    assert!(err.is_tool_missing());
    // The manifest is never fetched over plain HTTP
    assert!(server.received_requests().await.unwrap().is_empty());
    // No partial output left behind
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
