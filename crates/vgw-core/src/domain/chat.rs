//! Conversation history domain types (spec §3 `ConversationState`).

use serde::{Deserialize, Serialize};

use crate::domain::utterance::VisionAttachment;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool call an assistant message asked to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A single message in a conversation (spec §3).
///
/// Vision attachments only ever appear on `user` messages; `tool_calls`
/// only ever appears on `assistant` messages; `tool_call_id`/`tool_name`
/// only ever appear on `tool` messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<VisionAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>, attachments: Vec<VisionAttachment>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            attachments,
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    #[must_use]
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            tool_name: None,
        }
    }

    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            attachments: Vec::new(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }

    /// Whether this assistant message carries outgoing tool calls.
    #[must_use]
    pub fn has_outgoing_tool_calls(&self) -> bool {
        self.role == MessageRole::Assistant
            && self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Ordered conversation history (spec §3).
///
/// Invariants enforced by [`Self::trim_to`]:
/// - a `tool` message is only ever preceded (possibly through other `tool`
///   messages) by an `assistant` message carrying the matching tool call id;
/// - trimming never splits such a group;
/// - the system message at index 0, if present, is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn has_system_prompt(&self) -> bool {
        self.messages.first().is_some_and(|m| m.role == MessageRole::System)
    }

    /// Set (or replace) the system prompt at index 0.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let msg = Message::system(prompt);
        if self.has_system_prompt() {
            self.messages[0] = msg;
        } else {
            self.messages.insert(0, msg);
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The last N non-system messages plus the system message if any
    /// (spec §4.4 Step B: the windowed history sent to the LLM).
    #[must_use]
    pub fn windowed(&self, n: usize) -> Vec<Message> {
        let system = self.messages.first().filter(|m| m.role == MessageRole::System);
        let rest_start = usize::from(system.is_some());
        let rest = &self.messages[rest_start..];
        let tail_start = rest.len().saturating_sub(n);

        let mut out = Vec::with_capacity(n + 1);
        if let Some(s) = system {
            out.push(s.clone());
        }
        out.extend_from_slice(&rest[tail_start..]);
        out
    }

    /// Trim the history to at most `limit + 2` messages (spec §4.4), never
    /// splitting a tool-call group and never removing the system message.
    pub fn trim_to(&mut self, limit: usize) {
        let cap = limit + 2;
        if self.messages.len() <= cap {
            return;
        }

        let system_offset = usize::from(self.has_system_prompt());
        let mut cut = self.messages.len() - cap;
        // Never cut into the system message.
        cut = cut.max(system_offset);

        // Advance the boundary forward while it would split a tool-call
        // group: the message at `cut` is itself `tool`, or it is
        // `assistant` with outgoing tool calls (whose results would be
        // orphaned if we kept the assistant message but dropped its
        // `tool` replies).
        while cut < self.messages.len() {
            let at_cut = &self.messages[cut];
            let splits_group = at_cut.role == MessageRole::Tool
                || at_cut.has_outgoing_tool_calls();
            if splits_group {
                cut += 1;
            } else {
                break;
            }
        }

        if let Some(sys) = (system_offset == 1).then(|| self.messages[0].clone()) {
            let mut kept = vec![sys];
            kept.extend(self.messages.drain(cut..));
            self.messages = kept;
        } else {
            self.messages.drain(..cut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_preserves_system_message() {
        let mut state = ConversationState::new();
        state.set_system_prompt("be helpful");
        for i in 0..10 {
            state.push(Message::user(format!("msg {i}"), vec![]));
        }
        state.trim_to(4);
        assert_eq!(state.messages()[0].role, MessageRole::System);
        assert!(state.len() <= 4 + 2 + 1);
    }

    #[test]
    fn trim_never_splits_a_tool_call_group() {
        let mut state = ConversationState::new();
        state.push(Message::user("hi", vec![]));
        for i in 0..6 {
            state.push(Message::user(format!("filler {i}"), vec![]));
        }
        state.push(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall {
                call_id: "c1".into(),
                name: "get_weather".into(),
                arguments: serde_json::json!({}),
            }],
        ));
        state.push(Message::tool_result("c1", "get_weather", "{}"));
        state.push(Message::assistant("done"));

        state.trim_to(2);

        let messages = state.messages();
        for (i, m) in messages.iter().enumerate() {
            if m.role == MessageRole::Tool {
                assert!(i > 0);
                assert!(messages[..i].iter().rev().take_while(|p| p.role == MessageRole::Tool).count() < i);
                let preceding_assistant = messages[..i]
                    .iter()
                    .rev()
                    .find(|p| p.role != MessageRole::Tool);
                assert!(preceding_assistant.is_some_and(Message::has_outgoing_tool_calls));
            }
        }
    }

    #[test]
    fn windowed_keeps_system_plus_last_n() {
        let mut state = ConversationState::new();
        state.set_system_prompt("sys");
        for i in 0..20 {
            state.push(Message::user(format!("m{i}"), vec![]));
        }
        let windowed = state.windowed(8);
        assert_eq!(windowed.len(), 9);
        assert_eq!(windowed[0].role, MessageRole::System);
        assert_eq!(windowed.last().unwrap().content, "m19");
    }
}
