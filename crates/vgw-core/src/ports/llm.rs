//! Language-model capability interface (spec §4.4 Step A, §4.6, §1
//! Non-goals: provider network behavior is a black box).
//!
//! Streams deltas over a channel rather than returning an owned stream type,
//! mirroring the "channel from a dedicated turn task" idiom spec §9
//! recommends and the mpsc-event pattern in
//! `gglib-voice::pipeline::VoicePipeline::new`.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::chat::{Message, ToolCall};
use crate::domain::playbook::ModelConfig;
use crate::error::GatewayError;
use crate::ports::tool::ToolSpec;

/// A bounded LLM call (spec §3 `effective prompt/tools/model config`).
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice_required: bool,
    pub model_config: ModelConfig,
}

/// One piece of a streaming completion.
#[derive(Debug, Clone)]
pub enum LlmDelta {
    Content(String),
    ToolCall(ToolCall),
}

/// The aggregated result of a streamed completion (spec §4.6 two-phase
/// turn: a response is either plain content, or one or more tool calls).
#[derive(Debug, Clone, Default)]
pub struct LlmCompletion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmCompletion {
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Sends content/tool-call fragments to `deltas` as they arrive,
    /// returning the aggregated completion once the provider signals
    /// completion. A provider without a true streaming mode may send the
    /// whole response as one `Content` delta before returning.
    async fn stream_completion(
        &self,
        request: LlmRequest,
        deltas: UnboundedSender<LlmDelta>,
    ) -> Result<LlmCompletion, GatewayError>;
}

/// Free-form structured data a custom transition condition or tool handler
/// may need (e.g. an intent classifier's output). Kept as `Value` since the
/// shape is provider-defined, not part of this crate's domain.
pub type ProviderMetadata = Value;
