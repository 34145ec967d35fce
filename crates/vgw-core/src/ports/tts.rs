//! Text-to-speech capability interface (spec §4.4 Step B, §1 Non-goals).
//!
//! Mirrors `gglib-voice::backend::TtsBackend`, with `samples` swapped for
//! wire-ready PCM16LE bytes since that is what a `TtsChunk` event carries.

use async_trait::async_trait;

use crate::error::GatewayError;

/// A synthesized sentence: 16-bit PCM, little-endian, mono.
#[derive(Debug, Clone)]
pub struct TtsAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl TtsAudio {
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        let samples = self.pcm.len() / 2;
        (samples as u64 * 1000) / u64::from(self.sample_rate.max(1))
    }
}

/// Synthesizes one sentence-sized chunk of text at a time (spec §4.4 Step B:
/// the turn pipeline dispatches per sentence boundary, not per full reply).
#[async_trait]
pub trait TtsPort: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<TtsAudio, GatewayError>;
}
