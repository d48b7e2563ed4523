//! HTTP Error Handling
//!
//! 业务错误统一返回 HTTP 200 + errno

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ports::PlaybackError;
use crate::application::ApplicationError;
use crate::domain::capture::CaptureError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const UNAUTHORIZED: i32 = 401;
    pub const CONFLICT: i32 = 409;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Unauthorized(_) => errno::UNAUTHORIZED,
            ApiError::Conflict(_) => errno::CONFLICT,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let errno = self.errno();
        let msg = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno, error = %msg, "Bad request");
                msg
            }
            ApiError::Unauthorized(msg) => {
                tracing::warn!(errno, error = %msg, "Missing credentials");
                msg
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(errno, error = %msg, "State conflict");
                msg
            }
            ApiError::Internal(msg) => {
                tracing::error!(errno, error = %msg, "Internal server error");
                msg
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(errno, error = %msg, "Service unavailable");
                msg
            }
        };

        (StatusCode::OK, Json(ErrorResponse::new(errno, msg))).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        let msg = e.to_string();
        match e {
            ApplicationError::MissingCredentials => ApiError::Unauthorized(msg),
            ApplicationError::ValidationError(_) => ApiError::BadRequest(msg),
            ApplicationError::InvalidState(_) => ApiError::Conflict(msg),
            ApplicationError::ProviderError(_) => ApiError::ServiceUnavailable(msg),
            ApplicationError::CaptureError(CaptureError::DeviceAcquisition(_)) => {
                ApiError::ServiceUnavailable(msg)
            }
            ApplicationError::CaptureError(CaptureError::InvalidTransition { .. }) => {
                ApiError::Conflict(msg)
            }
            ApplicationError::CaptureError(_) => ApiError::Internal(msg),
            ApplicationError::PlaybackError(PlaybackError::NoDevice(_)) => {
                ApiError::ServiceUnavailable(msg)
            }
            ApplicationError::PlaybackError(_)
            | ApplicationError::CodecError(_)
            | ApplicationError::InternalError(_) => ApiError::Internal(msg),
        }
    }
}
