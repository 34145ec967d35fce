//! Utterance and vision-attachment domain types (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A MIME-tagged image payload referenced by a subsequent user message
/// until consumed (spec §3 `VisionAttachment`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionAttachment {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// An immutable, STT-ready speech segment emitted by the utterance
/// assembler (spec §3, §4.3).
#[derive(Debug, Clone)]
pub struct Utterance {
    /// 16 kHz mono 16-bit PCM, WAV-wrapped (spec §6 WAV wrapper).
    pub wav_bytes: Vec<u8>,
    pub speech_start_time: DateTime<Utc>,
    pub speech_end_time: DateTime<Utc>,
    pub attachments: Vec<VisionAttachment>,
}

impl Utterance {
    /// Wrap 16 kHz mono 16-bit PCM in a 44-byte RIFF/WAVE header (spec §6).
    #[must_use]
    pub fn wav_wrap(pcm: &[u8]) -> Vec<u8> {
        const SAMPLE_RATE: u32 = 16_000;
        const CHANNELS: u16 = 1;
        const BITS_PER_SAMPLE: u16 = 16;

        let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
        let byte_rate = SAMPLE_RATE * u32::from(CHANNELS) * u32::from(BITS_PER_SAMPLE) / 8;
        let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

        let mut out = Vec::with_capacity(44 + pcm.len());
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&CHANNELS.to_le_bytes());
        out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend_from_slice(pcm);
        out
    }
}
