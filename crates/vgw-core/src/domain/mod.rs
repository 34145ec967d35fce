//! Domain types, independent of any infrastructure concern.

pub mod chat;
pub mod playbook;
pub mod session;
pub mod turn_event;
pub mod utterance;

pub use chat::{ConversationState, Message, MessageRole, ToolCall};
pub use playbook::{Playbook, PlaybookRuntime, Stage, Transition, TransitionCondition};
pub use session::Session;
pub use turn_event::TurnEvent;
pub use utterance::{Utterance, VisionAttachment};
