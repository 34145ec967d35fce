//! A deterministic TTS mock: synthesizes silence sized to the input text so
//! chunk pacing/duration math can be exercised without a real voice model.

use async_trait::async_trait;

use vgw_core::error::GatewayError;
use vgw_core::ports::tts::{TtsAudio, TtsPort};

pub struct MockTts {
    pub sample_rate: u32,
    /// Simulated samples produced per input character.
    pub samples_per_char: usize,
}

impl Default for MockTts {
    fn default() -> Self {
        Self { sample_rate: 24_000, samples_per_char: 480 }
    }
}

#[async_trait]
impl TtsPort for MockTts {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<TtsAudio, GatewayError> {
        let samples = text.chars().count() * self.samples_per_char;
        Ok(TtsAudio { pcm: vec![0u8; samples * 2], sample_rate: self.sample_rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthesized_duration_scales_with_text_length() {
        let tts = MockTts::default();
        let short = tts.synthesize("hi", "default").await.unwrap();
        let long = tts.synthesize("hello there", "default").await.unwrap();
        assert!(long.duration_ms() > short.duration_ms());
    }
}
