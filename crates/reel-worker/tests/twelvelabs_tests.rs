//! TwelveLabs client tests against a mock HTTP server.

use reel_worker::config::TwelveLabsConfig;
use reel_worker::{TwelveLabsClient, VideoIntelligence, WorkerError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> TwelveLabsClient {
    TwelveLabsClient::new(&TwelveLabsConfig {
        api_key: Some("tlk_test".to_string()),
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_video_details_reads_stream_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/idx/videos/vid"))
        .and(query_param("embed", "false"))
        .and(header("x-api-key", "tlk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "vid",
            "system_metadata": {
                "filename": "match.mp4",
                "duration": 5400.5,
                "width": 1920,
                "height": 1080,
                "fps": 25.0
            },
            "hls": {
                "video_url": "https://cdn.example.com/vid/master.m3u8",
                "thumbnail_urls": []
            }
        })))
        .mount(&server)
        .await;

    let details = client(&server).video_details("idx", "vid").await.unwrap();

    assert_eq!(details.id, "vid");
    assert_eq!(details.display_name(), "match.mp4");
    assert_eq!(details.duration, Some(5400.5));
    assert_eq!(details.width, Some(1920));
    assert_eq!(
        details.stream_url.as_deref(),
        Some("https://cdn.example.com/vid/master.m3u8")
    );
}

#[tokio::test]
async fn test_unknown_video_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": "video_not_found"})))
        .mount(&server)
        .await;

    let result = client(&server).video_details("idx", "nope").await;

    assert!(matches!(
        result,
        Err(WorkerError::VideoNotFound { ref video_id, .. }) if video_id == "nope"
    ));
}

#[tokio::test]
async fn test_analyze_posts_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(header("x-api-key", "tlk_test"))
        .and(body_json(json!({
            "video_id": "vid",
            "prompt": "Find the goals",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen_1",
            "data": "**Opening goal**: [12s ~ 40s]"
        })))
        .mount(&server)
        .await;

    let text = client(&server).analyze("vid", "Find the goals").await.unwrap();

    assert_eq!(text, "**Opening goal**: [12s ~ 40s]");
}

#[tokio::test]
async fn test_analyze_error_status_is_ai_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let result = client(&server).analyze("vid", "prompt").await;

    match result {
        Err(WorkerError::AiFailed(msg)) => assert!(msg.contains("429") && msg.contains("slow down")),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_transcription_parses_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/idx/videos/vid/text"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"start": 1.0, "end": 2.5, "value": "kick off"},
                {"start": 9.0, "end": 8.0, "value": "broken"},
                {"start": 60.0, "end": 63.0, "value": "what a goal"}
            ]
        })))
        .mount(&server)
        .await;

    let track = client(&server).transcription("idx", "vid").await.unwrap();

    assert_eq!(track.len(), 2);
    assert_eq!(track[0].text, "kick off");
    assert_eq!((track[1].start, track[1].end), (60.0, 63.0));
}

#[tokio::test]
async fn test_transcription_unavailable_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let track = client(&server).transcription("idx", "vid").await.unwrap();

    assert!(track.is_empty());
}

#[tokio::test]
async fn test_list_indexes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(query_param("page", "1"))
        .and(header("x-api-key", "tlk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"_id": "idx1", "index_name": "matches", "video_count": 12},
                {"_id": "idx2", "index_name": "training"}
            ],
            "page_info": {"page": 1, "total_page": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let indexes = client(&server).list_indexes(0).await.unwrap();

    assert_eq!(indexes.len(), 2);
    assert_eq!((indexes[0].id.as_str(), indexes[0].name.as_str()), ("idx1", "matches"));
    assert_eq!(indexes[0].video_count, Some(12));
    assert_eq!(indexes[1].video_count, None);
    assert_eq!(
        serde_json::to_value(&indexes[1]).unwrap(),
        json!({"id": "idx2", "name": "training"})
    );
}

#[tokio::test]
async fn test_list_indexes_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = client(&server).list_indexes(1).await.unwrap_err();

    assert!(matches!(err, WorkerError::AiFailed(_)));
    assert!(err.to_string().contains("bad key"));
}

#[tokio::test]
async fn test_list_videos_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/idx/videos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"_id": "a", "system_metadata": {"filename": "one.mp4", "duration": 10.0}},
                {"_id": "b"}
            ],
            "page_info": {"page": 2, "total_page": 2}
        })))
        .mount(&server)
        .await;

    let videos = client(&server).list_videos("idx", 2).await.unwrap();

    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].display_name(), "one.mp4");
    assert_eq!(videos[1].display_name(), "Video b");
    assert!(videos[1].stream_url.is_none());
}
