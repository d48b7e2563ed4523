//! Capture Handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::tts::header_value;
use crate::application::{BeepCommand, RecordCommand, StopRecordingCommand};
use crate::infrastructure::http::dto::{ApiResponse, Empty, RecordRequest, StopRecordingResponseDto};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub const RECORDING_ID_HEADER: &str = "x-recording-id";
pub const RECORDING_DURATION_HEADER: &str = "x-recording-duration-ms";
pub const RECORDING_STOP_REASON_HEADER: &str = "x-recording-stop-reason";

/// 录一段语音，直到静音、超时或手动停止
///
/// 请求体可省略，省略时不播放提示音
pub async fn record(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: RecordRequest = if body.is_empty() {
        RecordRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let result = state
        .record_handler
        .handle(RecordCommand { beep: req.beep })
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, header_value(result.artifact.mime_type())?),
            (
                HeaderName::from_static(RECORDING_ID_HEADER),
                header_value(result.session_id)?,
            ),
            (
                HeaderName::from_static(RECORDING_DURATION_HEADER),
                header_value(result.duration_ms)?,
            ),
            (
                HeaderName::from_static(RECORDING_STOP_REASON_HEADER),
                header_value(result.stop_reason)?,
            ),
        ],
        result.artifact.to_vec(),
    )
        .into_response())
}

pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StopRecordingResponseDto>>, ApiError> {
    let result = state
        .stop_recording_handler
        .handle(StopRecordingCommand)
        .await?;

    Ok(Json(ApiResponse::success(StopRecordingResponseDto {
        session_id: result.session_id,
    })))
}

pub async fn beep(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.beep_handler.handle(BeepCommand).await?;
    Ok(Json(ApiResponse::ok()))
}
