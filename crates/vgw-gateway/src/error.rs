//! HTTP-specific error mapping (mirrors `gglib-axum::error::HttpError`):
//! converts the domain `GatewayError`/`ErrorCode` into an HTTP status code
//! and JSON body for the few plain HTTP routes this gateway exposes
//! (health check, session admin). The WebSocket control channel uses its
//! own `error{code,message}` wire frame instead (`wire::ServerMessage::Error`,
//! spec §6) since it isn't request/response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use vgw_core::error::{ErrorCode, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::SessionNotFound, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidMessage, msg.clone()),
            Self::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::WebrtcUnavailable, msg.clone())
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, msg.clone()),
        };
        (status, axum::Json(ErrorBody { code, message })).into_response()
    }
}

/// Capability/internal errors surfaced from the turn pipeline map onto the
/// same taxonomy (spec §7 propagation policy, §4.10 codes).
impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            ErrorCode::SessionNotFound => Self::NotFound(err.message),
            ErrorCode::InvalidMessage => Self::BadRequest(err.message),
            ErrorCode::WebrtcUnavailable => Self::ServiceUnavailable(err.message),
            ErrorCode::AudioProcessingError
            | ErrorCode::SttError
            | ErrorCode::LlmError
            | ErrorCode::TtsError
            | ErrorCode::InternalError => Self::Internal(err.message),
        }
    }
}
