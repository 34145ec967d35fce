//! Audio-pipeline error types.

/// Errors surfaced by the VAD gate's external model (spec §1: "the VAD
/// itself is an external model; we specify only its required contract").
/// The reframer has no internal error path — I/O failures surface from the
/// sink it feeds (spec §4.1).
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("VAD model error: {0}")]
    VadModel(String),
}
