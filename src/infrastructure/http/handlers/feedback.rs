//! Feedback Handlers - 单词注释与发音评分

use axum::{extract::State, http::HeaderMap, Json};
use base64::Engine;
use std::sync::Arc;

use super::tts::request_credentials;
use crate::application::ports::Annotation;
use crate::application::{AnnotateWordCommand, PronunciationResult, ScorePronunciationCommand};
use crate::infrastructure::http::dto::{AnnotateRequest, ApiResponse, PronunciationRequestDto};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn annotate_word(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AnnotateRequest>,
) -> Result<Json<ApiResponse<Annotation>>, ApiError> {
    let cmd = AnnotateWordCommand {
        word: req.word,
        context: req.context,
        target_language: req.target_language,
        credentials: request_credentials(&headers),
    };

    let annotation = state.annotate_word_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(annotation)))
}

pub async fn score_pronunciation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PronunciationRequestDto>,
) -> Result<Json<ApiResponse<PronunciationResult>>, ApiError> {
    let audio = base64::engine::general_purpose::STANDARD
        .decode(req.audio_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid audio_base64: {}", e)))?;

    let cmd = ScorePronunciationCommand {
        text: req.text,
        audio,
        mime_type: req.mime_type,
        target_language: req.target_language,
        credentials: request_credentials(&headers),
    };

    let result = state.score_pronunciation_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result)))
}
