//! Utterance Assembler (spec component C3, §4.3).
//!
//! Pure packaging step: turns a VAD speech-end payload into a self-contained,
//! STT-ready [`Utterance`]. Draining the session's pending-vision queue is
//! the caller's responsibility (it needs session access this crate doesn't
//! have) — the caller passes the drained attachments in.

use chrono::{DateTime, Utc};
use vgw_core::domain::utterance::{Utterance, VisionAttachment};

use crate::vad_gate::speech_end_to_pcm16;

/// Assemble an [`Utterance`] from a VAD `speech-end` payload (spec §4.3
/// steps 1-3).
#[must_use]
pub fn assemble(
    audio_16k: &[f32],
    speech_start_time: DateTime<Utc>,
    speech_end_time: DateTime<Utc>,
    attachments: Vec<VisionAttachment>,
) -> Utterance {
    let pcm = speech_end_to_pcm16(audio_16k);
    let wav_bytes = Utterance::wav_wrap(&pcm);
    Utterance { wav_bytes, speech_start_time, speech_end_time, attachments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembled_utterance_carries_a_valid_wav_header() {
        let now = Utc::now();
        let utterance = assemble(&[0.0; 160], now, now, vec![]);
        assert_eq!(&utterance.wav_bytes[0..4], b"RIFF");
        assert_eq!(&utterance.wav_bytes[8..12], b"WAVE");
    }
}
