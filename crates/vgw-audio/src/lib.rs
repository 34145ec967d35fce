//! Audio-path components of the voice gateway: reframing, VAD gating, and
//! utterance assembly (spec components C1-C3).
//!
//! STT/TTS providers and the VAD's underlying model are pluggable
//! capability interfaces defined in `vgw_core::ports` and implemented
//! elsewhere (`vgw-providers`); this crate only contains the pure signal
//! processing around them.

pub mod assembler;
pub mod error;
pub mod reframer;
pub mod vad_gate;

pub use assembler::assemble;
pub use error::AudioError;
pub use reframer::Reframer;
pub use vad_gate::{VadEvent, VadGate, VadGateConfig, VadModel};
