//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                   GET   健康检查
//! - /api/tts/audio              POST  获取合成音频（字节流）
//! - /api/tts/speak              POST  合成并在本机播放
//! - /api/tts/cache/clear        POST  清空 TTS 缓存
//! - /api/tts/cache/stats        GET   缓存统计
//! - /api/capture/record         POST  VAD 录音（字节流）
//! - /api/capture/stop           POST  手动停止当前录音
//! - /api/capture/beep           POST  播放提示音
//! - /api/feedback/annotate      POST  单词音标与释义
//! - /api/feedback/pronunciation POST  发音评分
//! - /ws/events                  WS    录音与缓存事件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/tts", tts_routes())
        .nest("/capture", capture_routes())
        .nest("/feedback", feedback_routes())
}

/// TTS 路由
fn tts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/audio", post(handlers::fetch_audio))
        .route("/speak", post(handlers::speak))
        .route("/cache/clear", post(handlers::clear_cache))
        .route("/cache/stats", get(handlers::cache_stats))
}

/// Capture 路由
fn capture_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/record", post(handlers::record))
        .route("/stop", post(handlers::stop_recording))
        .route("/beep", post(handlers::beep))
}

/// Feedback 路由
fn feedback_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/annotate", post(handlers::annotate_word))
        .route("/pronunciation", post(handlers::score_pronunciation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::state::test_support::app_state;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app() -> Router {
        create_routes().with_state(Arc::new(app_state()))
    }

    fn post_json(uri: &str, body: &str, api_key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = app().oneshot(get("/api/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["recording"], false);
    }

    #[tokio::test]
    async fn test_fetch_audio_reports_cache_hit() {
        let app = app();
        let body = r#"{"text":"Hello world"}"#;

        let first = app
            .clone()
            .oneshot(post_json("/api/tts/audio", body, Some("key")))
            .await
            .unwrap();
        assert_eq!(first.headers()["x-audio-cache"], "miss");
        assert_eq!(first.headers()["content-type"], "audio/wav");
        assert!(first.headers().contains_key("x-audio-duration-ms"));
        let bytes = to_bytes(first.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");

        let second = app
            .clone()
            .oneshot(post_json("/api/tts/audio", body, Some("key")))
            .await
            .unwrap();
        assert_eq!(second.headers()["x-audio-cache"], "hit");

        let stats = json_body(app.oneshot(get("/api/tts/cache/stats")).await.unwrap()).await;
        assert_eq!(stats["errno"], 0);
        assert_eq!(stats["data"]["persistent_entries"], 1);
        assert_eq!(stats["data"]["memory_hits"], 1);
    }

    #[tokio::test]
    async fn test_fetch_audio_without_key_is_unauthorized() {
        let response = app()
            .oneshot(post_json("/api/tts/audio", r#"{"text":"Hello"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["errno"], 401);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let app = app();
        app.clone()
            .oneshot(post_json("/api/tts/audio", r#"{"text":"cached"}"#, Some("key")))
            .await
            .unwrap();

        let cleared = json_body(
            app.clone()
                .oneshot(post_json("/api/tts/cache/clear", "", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(cleared["errno"], 0);

        let stats = json_body(app.oneshot(get("/api/tts/cache/stats")).await.unwrap()).await;
        assert_eq!(stats["data"]["persistent_entries"], 0);
        assert_eq!(stats["data"]["memory_entries"], 0);
    }

    #[tokio::test]
    async fn test_record_without_device_is_unavailable() {
        let response = app()
            .oneshot(post_json("/api/capture/record", "", None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["errno"], 503);
    }

    #[tokio::test]
    async fn test_stop_without_recording_conflicts() {
        let response = app()
            .oneshot(post_json("/api/capture/stop", "", None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["errno"], 409);
    }

    #[tokio::test]
    async fn test_annotate_word() {
        let response = app()
            .oneshot(post_json(
                "/api/feedback/annotate",
                r#"{"word":"vivid","context":"A vivid dream."}"#,
                Some("key"),
            ))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["ipa"], "/vivid/");
    }

    #[tokio::test]
    async fn test_pronunciation_rejects_bad_base64() {
        let response = app()
            .oneshot(post_json(
                "/api/feedback/pronunciation",
                r#"{"text":"hello","audio_base64":"!!!","mime_type":"audio/wav"}"#,
                Some("key"),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["errno"], 400);
    }
}
