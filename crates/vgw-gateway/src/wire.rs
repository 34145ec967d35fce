//! Wire Protocol Codec (spec component C11, §6).
//!
//! JSON messages exchanged over the control WebSocket. Field casing on the
//! wire is camelCase; message discriminants are the kebab-case `type` tag
//! shown in spec §6 (`ready`, `tts-chunk`, `stage-change`, ...).

use base64::Engine;
use serde::{Deserialize, Serialize};

use vgw_core::domain::turn_event::TurnEvent;
use vgw_core::error::ErrorCode;

#[derive(Debug, Clone, Deserialize)]
pub struct WireAttachment {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Client -> server control messages (spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ping {
        timestamp: i64,
    },
    Reconnect {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Offer {
        signal: serde_json::Value,
    },
    Signal {
        signal: serde_json::Value,
    },
    /// Fallback audio path used whenever no peer media track is available
    /// (this gateway never negotiates one — see `DESIGN.md`): the whole
    /// utterance arrives pre-segmented, base64-encoded, bypassing C1/C2.
    Audio {
        data: String,
        #[serde(default)]
        attachments: Vec<WireAttachment>,
    },
    Attachments {
        attachments: Vec<WireAttachment>,
    },
}

/// Server -> client control messages (spec §6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Ready {
        id: String,
        #[serde(rename = "protocolVersion")]
        protocol_version: u32,
    },
    Pong {
        timestamp: i64,
    },
    Signal {
        signal: serde_json::Value,
    },
    ReconnectAck {
        success: bool,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "historyRecovered")]
        history_recovered: bool,
    },
    Transcript {
        text: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
    },
    LlmChunk {
        content: String,
        done: bool,
    },
    Llm {
        text: String,
    },
    TtsStart {},
    TtsChunk {
        format: &'static str,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        data: String,
    },
    TtsComplete {},
    TtsCancelled {},
    SpeechStart {},
    SpeechEnd {},
    ToolCallStart {
        name: String,
        #[serde(rename = "callId")]
        call_id: String,
        arguments: serde_json::Value,
    },
    ToolCallEnd {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    StageChange {
        from: String,
        to: String,
        reason: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    #[must_use]
    pub const fn protocol_version() -> u32 {
        1
    }
}

/// Every `TurnEvent` has exactly one wire rendering (spec §4.9 "On every
/// `TurnEvent` forward the corresponding wire message"). `speech-start`
/// and `speech-end` are not `TurnEvent`s (the VAD gate, not a turn runner,
/// produces them) and are constructed directly by the supervisor.
impl From<&TurnEvent> for ServerMessage {
    fn from(event: &TurnEvent) -> Self {
        match event {
            TurnEvent::Transcript { text, is_final } => {
                Self::Transcript { text: text.clone(), is_final: *is_final }
            }
            TurnEvent::LlmDelta { content, done } => Self::LlmChunk { content: content.clone(), done: *done },
            TurnEvent::LlmFinal { full_text } => Self::Llm { text: full_text.clone() },
            TurnEvent::TtsStart => Self::TtsStart {},
            TurnEvent::TtsChunk { pcm, sample_rate, .. } => Self::TtsChunk {
                format: "pcm",
                sample_rate: *sample_rate,
                data: base64::engine::general_purpose::STANDARD.encode(pcm),
            },
            TurnEvent::TtsComplete => Self::TtsComplete {},
            TurnEvent::TtsCancelled => Self::TtsCancelled {},
            TurnEvent::ToolCallStart { name, call_id, arguments } => {
                Self::ToolCallStart { name: name.clone(), call_id: call_id.clone(), arguments: arguments.clone() }
            }
            TurnEvent::ToolCallEnd { call_id, result, error, duration_ms } => Self::ToolCallEnd {
                call_id: call_id.clone(),
                result: result.clone(),
                error: error.clone(),
                duration_ms: *duration_ms,
            },
            TurnEvent::StageChange { from, to, reason } => {
                Self::StageChange { from: from.clone(), to: to.clone(), reason: reason.clone() }
            }
            TurnEvent::Error { code, message } => Self::Error { code: *code, message: message.clone() },
        }
    }
}
