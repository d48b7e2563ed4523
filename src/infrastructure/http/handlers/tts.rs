//! TTS Handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::application::{
    ClearCacheCommand, Credentials, FetchAudioCommand, GetCacheStatsQuery, SpeakCommand,
};
use crate::application::ports::CacheStats;
use crate::infrastructure::http::dto::{ApiResponse, Empty, SpeakResponseDto, TextRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 请求头中的 API Key
pub const API_KEY_HEADER: &str = "x-api-key";
pub const AUDIO_CACHE_HEADER: &str = "x-audio-cache";
pub const AUDIO_DURATION_HEADER: &str = "x-audio-duration-ms";

/// 读取请求头凭证，缺失时由 Handler 回落到配置
pub fn request_credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(Credentials::new)
}

pub(crate) fn header_value(value: impl ToString) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&value.to_string()).map_err(|e| ApiError::Internal(e.to_string()))
}

/// 获取音频字节
pub async fn fetch_audio(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TextRequest>,
) -> Result<Response, ApiError> {
    let cmd = FetchAudioCommand {
        text: req.text,
        credentials: request_credentials(&headers),
    };

    let result = state.fetch_audio_handler.handle(cmd).await?;

    let cache = if result.cache_hit { "hit" } else { "miss" };
    let mut response = (
        [
            (header::CONTENT_TYPE, header_value(result.artifact.mime_type())?),
            (
                header::HeaderName::from_static(AUDIO_CACHE_HEADER),
                HeaderValue::from_static(cache),
            ),
        ],
        result.artifact.to_vec(),
    )
        .into_response();

    if let Some(duration_ms) = result.duration_ms {
        response.headers_mut().insert(
            header::HeaderName::from_static(AUDIO_DURATION_HEADER),
            header_value(duration_ms)?,
        );
    }
    Ok(response)
}

/// 在本机扬声器播放
pub async fn speak(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TextRequest>,
) -> Result<Json<ApiResponse<SpeakResponseDto>>, ApiError> {
    let cmd = SpeakCommand {
        text: req.text,
        credentials: request_credentials(&headers),
    };

    let result = state.speak_handler.handle(cmd).await?;

    Ok(Json(ApiResponse::success(SpeakResponseDto {
        duration_ms: result.duration_ms,
        mime_type: result.mime_type,
        cache_hit: result.cache_hit,
    })))
}

pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.clear_cache_handler.handle(ClearCacheCommand).await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CacheStats>>, ApiError> {
    let stats = state
        .get_cache_stats_handler
        .handle(GetCacheStatsQuery)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}
