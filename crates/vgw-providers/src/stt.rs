//! A scripted STT mock: returns a fixed transcript (or an injected error),
//! ignoring the WAV bytes entirely.

use async_trait::async_trait;
use std::sync::Mutex;

use vgw_core::error::GatewayError;
use vgw_core::ports::stt::SttPort;

pub struct MockStt {
    transcript: Mutex<String>,
}

impl MockStt {
    #[must_use]
    pub fn new(transcript: impl Into<String>) -> Self {
        Self { transcript: Mutex::new(transcript.into()) }
    }

    /// Change the transcript returned by the next call.
    pub fn set_transcript(&self, transcript: impl Into<String>) {
        *self.transcript.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = transcript.into();
    }
}

#[async_trait]
impl SttPort for MockStt {
    async fn transcribe(&self, _wav_bytes: &[u8]) -> Result<String, GatewayError> {
        Ok(self.transcript.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_configured_transcript() {
        let stt = MockStt::new("hello world");
        assert_eq!(stt.transcribe(b"ignored").await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn transcript_can_be_changed_between_calls() {
        let stt = MockStt::new("first");
        stt.set_transcript("second");
        assert_eq!(stt.transcribe(b"").await.unwrap(), "second");
    }
}
