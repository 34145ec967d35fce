//! Turn event stream element (spec §3 `Turn Event`).

use serde::{Deserialize, Serialize};

use crate::domain::chat::ToolCall;
use crate::error::ErrorCode;

/// One element of the typed event stream a turn runner produces (spec §3,
/// §8 grammar). Serialized over the wire via `vgw-gateway`'s codec — this
/// type itself is transport-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TurnEvent {
    Transcript { text: String, is_final: bool },
    LlmDelta { content: String, done: bool },
    LlmFinal { full_text: String },
    TtsStart,
    TtsChunk { pcm: Vec<u8>, sample_rate: u32, sentence: String },
    TtsComplete,
    TtsCancelled,
    ToolCallStart { name: String, call_id: String, arguments: serde_json::Value },
    ToolCallEnd { call_id: String, result: Option<serde_json::Value>, error: Option<String>, duration_ms: u64 },
    StageChange { from: String, to: String, reason: String },
    Error { code: ErrorCode, message: String },
}

impl TurnEvent {
    #[must_use]
    pub fn tool_call_start(call: &ToolCall) -> Self {
        Self::ToolCallStart {
            name: call.name.clone(),
            call_id: call.call_id.clone(),
            arguments: call.arguments.clone(),
        }
    }

    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error { code, message: message.into() }
    }
}
