//! Error taxonomy shared across the gateway (spec §4.10, §7).
//!
//! `ErrorCode` is the wire-visible discriminant sent to clients in
//! `error{code, message}` frames. `GatewayError` is the internal error type
//! that carries a code plus context; adapters convert their own error types
//! into it at the boundary, mirroring how `gglib-axum::error::HttpError`
//! converts `CoreError`/`GuiError` at the HTTP boundary.

use serde::{Deserialize, Serialize};

/// Stable wire error codes (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WebrtcUnavailable,
    AudioProcessingError,
    SttError,
    LlmError,
    TtsError,
    InvalidMessage,
    SessionNotFound,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn component(self) -> &'static str {
        match self {
            Self::WebrtcUnavailable => "peer_media",
            Self::AudioProcessingError => "audio",
            Self::SttError => "stt",
            Self::LlmError => "llm",
            Self::TtsError => "tts",
            Self::InvalidMessage => "wire",
            Self::SessionNotFound => "session",
            Self::InternalError => "internal",
        }
    }
}

/// A classified, wire-reportable error (spec §7 taxonomy: transport /
/// capability / policy / internal).
#[derive(Debug, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
    /// Whether this error class may be retried by the caller (LLM only — see
    /// `RetryPolicy`). Non-LLM capability errors are always terminal for the
    /// turn (spec §7).
    pub retryable: bool,
}

impl GatewayError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    #[must_use]
    pub fn retryable(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: true,
        }
    }
}
