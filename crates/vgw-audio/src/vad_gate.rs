//! VAD Gate (spec component C2, §4.2).
//!
//! Wraps an external speech-activity model — we specify only the model's
//! required contract (spec §1): scoring a 10 ms 48 kHz frame for speech
//! probability. Everything else (confirm/redemption state machine,
//! pre-speech padding, int16↔float32 conversion, downsampling the emitted
//! utterance to 16 kHz) is this gate's own logic.

/// A speech-activity model scoring one 48 kHz mono frame at a time. The
/// concrete model (e.g. a neural VAD) lives outside this crate; this trait
/// is the entire surface this gate depends on.
pub trait VadModel: Send {
    /// Speech probability in `[0, 1]` for one [`FRAME_SAMPLES`]-long frame
    /// of float32 samples normalized to `[-1, 1]`.
    fn score(&mut self, frame: &[f32]) -> f32;
}

#[derive(Debug, Clone, Copy)]
pub struct VadGateConfig {
    pub positive_threshold: f32,
    pub negative_threshold: f32,
    pub min_speech_frames: u32,
    pub redemption_frames: u32,
    pub pre_speech_pad_frames: usize,
}

impl Default for VadGateConfig {
    fn default() -> Self {
        Self {
            positive_threshold: 0.5,
            negative_threshold: 0.35,
            min_speech_frames: 5,
            redemption_frames: 50,
            pre_speech_pad_frames: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStart,
    /// 16 kHz mono float32 samples, including pre-speech padding.
    SpeechEnd { audio_16k: Vec<f32> },
}

#[derive(Debug)]
enum State {
    Listening { confirm_count: u32 },
    Speech { buffer: Vec<f32>, silence_count: u32 },
}

/// Stateful gate: `process` alternates `SpeechStart`/`SpeechEnd` exactly,
/// per frame of 48 kHz PCM16LE input (spec §4.2).
pub struct VadGate<M: VadModel> {
    model: M,
    config: VadGateConfig,
    state: State,
    pre_speech_pad: std::collections::VecDeque<Vec<f32>>,
}

impl<M: VadModel> VadGate<M> {
    pub fn new(model: M, config: VadGateConfig) -> Self {
        Self { model, config, state: State::Listening { confirm_count: 0 }, pre_speech_pad: std::collections::VecDeque::new() }
    }

    /// Process one 960-byte PCM16LE 48 kHz frame, returning at most one
    /// event (spec §4.2: "emits at most one speech-start before the
    /// matching speech-end").
    pub fn process(&mut self, frame_pcm: &[u8]) -> Option<VadEvent> {
        let frame_f32 = pcm16_to_f32(frame_pcm);
        let score = self.model.score(&frame_f32);

        match &mut self.state {
            State::Listening { confirm_count } => {
                if score >= self.config.positive_threshold {
                    *confirm_count += 1;
                } else {
                    *confirm_count = 0;
                }

                if self.pre_speech_pad.len() >= self.config.pre_speech_pad_frames && self.config.pre_speech_pad_frames > 0 {
                    self.pre_speech_pad.pop_front();
                }
                self.pre_speech_pad.push_back(frame_f32.clone());

                if *confirm_count >= self.config.min_speech_frames {
                    let mut buffer: Vec<f32> = self.pre_speech_pad.drain(..).flatten().collect();
                    buffer.extend(frame_f32);
                    self.state = State::Speech { buffer, silence_count: 0 };
                    return Some(VadEvent::SpeechStart);
                }
                None
            }
            State::Speech { buffer, silence_count } => {
                buffer.extend(frame_f32);
                if score < self.config.negative_threshold {
                    *silence_count += 1;
                } else {
                    *silence_count = 0;
                }

                if *silence_count >= self.config.redemption_frames {
                    let audio_48k = std::mem::take(buffer);
                    self.state = State::Listening { confirm_count: 0 };
                    self.pre_speech_pad.clear();
                    Some(VadEvent::SpeechEnd { audio_16k: downsample_48k_to_16k(&audio_48k) })
                } else {
                    None
                }
            }
        }
    }

    /// Force a `SpeechEnd` if speech is in progress; no-op otherwise (spec
    /// §4.2 "flush").
    pub fn flush(&mut self) -> Option<VadEvent> {
        if let State::Speech { buffer, .. } = &mut self.state {
            let audio_48k = std::mem::take(buffer);
            self.state = State::Listening { confirm_count: 0 };
            self.pre_speech_pad.clear();
            Some(VadEvent::SpeechEnd { audio_16k: downsample_48k_to_16k(&audio_48k) })
        } else {
            None
        }
    }
}

/// int16 PCM -> float32 normalized to `[-1, 1]` (spec §4.2).
fn pcm16_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32_768.0)
        .collect()
}

/// float32 `[-1, 1]` -> int16, clipped and rounded (spec §4.2).
fn f32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let clipped = s.clamp(-1.0, 1.0);
        let scaled = (clipped * 32_767.0).round() as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    out
}

/// Downsample 48 kHz mono float32 to 16 kHz by averaging each group of 3
/// samples (spec §4.2: "internally resampled to 16 kHz").
fn downsample_48k_to_16k(samples: &[f32]) -> Vec<f32> {
    samples
        .chunks(3)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// Convert the 16 kHz float32 speech-end payload to PCM16LE bytes, for
/// handoff to the utterance assembler (spec §4.3 step 1).
#[must_use]
pub fn speech_end_to_pcm16(audio_16k: &[f32]) -> Vec<u8> {
    f32_to_pcm16(audio_16k)
}
