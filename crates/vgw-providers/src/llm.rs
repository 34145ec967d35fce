//! A scripted LLM mock: replays a queue of canned responses, falling back
//! to echoing the last user message once the queue is drained.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use vgw_core::domain::chat::{MessageRole, ToolCall};
use vgw_core::error::GatewayError;
use vgw_core::ports::llm::{LlmCompletion, LlmDelta, LlmPort, LlmRequest};

/// One pre-scripted turn of the mock's behavior.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Content(String),
    ToolCalls(Vec<ToolCall>),
}

pub struct MockLlm {
    responses: Mutex<VecDeque<ScriptedResponse>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self { responses: Mutex::new(VecDeque::new()) }
    }
}

impl MockLlm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_responses(responses: Vec<ScriptedResponse>) -> Self {
        Self { responses: Mutex::new(responses.into()) }
    }

    pub fn push_response(&self, response: ScriptedResponse) {
        self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push_back(response);
    }

    fn next_response(&self) -> Option<ScriptedResponse> {
        self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front()
    }
}

fn stream_words(text: &str, deltas: &UnboundedSender<LlmDelta>) {
    for word in text.split_inclusive(' ') {
        let _ = deltas.send(LlmDelta::Content(word.to_string()));
    }
}

#[async_trait]
impl LlmPort for MockLlm {
    async fn stream_completion(
        &self,
        request: LlmRequest,
        deltas: UnboundedSender<LlmDelta>,
    ) -> Result<LlmCompletion, GatewayError> {
        match self.next_response() {
            Some(ScriptedResponse::ToolCalls(tool_calls)) => Ok(LlmCompletion { content: String::new(), tool_calls }),
            Some(ScriptedResponse::Content(text)) => {
                stream_words(&text, &deltas);
                Ok(LlmCompletion { content: text, tool_calls: vec![] })
            }
            None => {
                let last_user =
                    request.messages.iter().rev().find(|m| m.role == MessageRole::User).map(|m| m.content.clone());
                let reply = match last_user {
                    Some(text) => format!("You said: {text}"),
                    None => "I didn't catch that.".to_string(),
                };
                stream_words(&reply, &deltas);
                Ok(LlmCompletion { content: reply, tool_calls: vec![] })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgw_core::domain::chat::Message;
    use vgw_core::domain::playbook::ModelConfig;

    fn request(messages: Vec<Message>) -> LlmRequest {
        LlmRequest { messages, tools: vec![], tool_choice_required: false, model_config: ModelConfig::default() }
    }

    #[tokio::test]
    async fn echoes_the_last_user_message_when_no_script_queued() {
        let llm = MockLlm::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let completion = llm.stream_completion(request(vec![Message::user("hi", vec![])]), tx).await.unwrap();
        assert_eq!(completion.content, "You said: hi");
    }

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let llm = MockLlm::with_responses(vec![
            ScriptedResponse::ToolCalls(vec![ToolCall { call_id: "c1".into(), name: "lookup".into(), arguments: serde_json::json!({}) }]),
            ScriptedResponse::Content("done".into()),
        ]);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let first = llm.stream_completion(request(vec![]), tx.clone()).await.unwrap();
        assert!(first.has_tool_calls());
        let second = llm.stream_completion(request(vec![]), tx).await.unwrap();
        assert_eq!(second.content, "done");
    }
}
