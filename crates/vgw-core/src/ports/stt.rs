//! Speech-to-text capability interface (spec §4.3, §1 Non-goals: provider
//! network behavior is a black box, only this contract matters).
//!
//! Mirrors `gglib-voice::backend::SttBackend`.

use async_trait::async_trait;

use crate::error::GatewayError;

/// Transcribes a complete WAV-wrapped utterance into text.
#[async_trait]
pub trait SttPort: Send + Sync {
    /// `wav_bytes` is a 16 kHz mono 16-bit PCM WAV file (spec §6).
    async fn transcribe(&self, wav_bytes: &[u8]) -> Result<String, GatewayError>;
}
