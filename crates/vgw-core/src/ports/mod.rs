//! Port traits implemented by infrastructure crates.
//!
//! Mirrors `gglib-voice::backend::{SttBackend, TtsBackend}` and
//! `gglib-voice::audio_io::{AudioSource, AudioSink}`: this crate defines the
//! capability interfaces, `vgw-providers`/`vgw-audio`/`vgw-gateway` implement
//! them. Nothing here depends on a concrete provider or transport.

pub mod hooks;
pub mod llm;
pub mod peer_media;
pub mod stt;
pub mod tool;
pub mod tts;
pub mod vision;

pub use hooks::{ErrorCounters, TurnHookSink};
pub use llm::{LlmCompletion, LlmDelta, LlmPort, LlmRequest};
pub use peer_media::{PeerMediaEvent, PeerMediaPort};
pub use stt::SttPort;
pub use tool::{DuplicateToolError, ExecutionPolicy, ToolHandler, ToolRegistry, ToolSpec};
pub use tts::{TtsAudio, TtsPort};
pub use vision::VisionPort;
