//! Peer-media adaptor contract (spec §1 Non-goals: peer-connection
//! negotiation, ICE and codec internals are a black box — only this
//! contract matters).
//!
//! Mirrors the `AudioSource`/`AudioSink` split in `gglib-voice::audio_io`,
//! generalized from "local mic/speaker" to "browser peer connection": one
//! side pushes inbound PCM frames in, the other accepts outbound PCM frames
//! and a control channel for the wire protocol (spec §6).

use async_trait::async_trait;

use crate::error::GatewayError;

/// Lifecycle signal from the adaptor, independent of the audio/control
/// streams themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMediaEvent {
    Connected,
    Disconnected,
    Error(String),
}

/// One connection's inbound audio + outbound audio + control-message duplex,
/// as seen by [`crate`] — the browser SDK and the peer-connection machinery
/// behind it are entirely opaque.
#[async_trait]
pub trait PeerMediaPort: Send + Sync {
    /// Native sample rate of frames yielded by [`Self::recv_audio`] (spec §4.1
    /// reframer: input may be any rate, reframed to 48 kHz internally).
    fn input_sample_rate(&self) -> u32;

    /// Blocks until the next inbound raw PCM16LE frame, or `None` once the
    /// peer connection has closed.
    async fn recv_audio(&self) -> Option<Vec<u8>>;

    /// Sends a PCM16LE frame to the peer for playback.
    async fn send_audio(&self, pcm: &[u8]) -> Result<(), GatewayError>;

    /// Sends one control-channel JSON message (spec §6 server→client
    /// messages).
    async fn send_control(&self, message: serde_json::Value) -> Result<(), GatewayError>;

    /// Blocks until the next inbound control-channel JSON message, or
    /// `None` once the peer connection has closed.
    async fn recv_control(&self) -> Option<serde_json::Value>;
}
