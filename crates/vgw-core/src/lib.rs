//! Domain types and port definitions for the voice gateway.
//!
//! This crate is the hexagonal core: domain types (conversation history,
//! turn events, playbooks, sessions) and the port traits infrastructure
//! crates implement (speech-to-text, language model, text-to-speech,
//! vision, tool execution). Nothing here depends on axum, a concrete
//! audio backend, or a concrete LLM client.

pub mod cancel;
pub mod domain;
pub mod error;
pub mod ports;

pub use cancel::AbortToken;
pub use error::{ErrorCode, GatewayError};
