//! Paced outbound send loop (spec component C1, §4.1, §4.7, §5).
//!
//! `TtsChunk` payloads release to the client at real-time pace instead of
//! all at once: the PCM is fed through a [`Reframer`] to derive 10 ms/48 kHz
//! frame boundaries, and one frame interval is slept per frame before the
//! (unresampled, provider-native-rate) chunk is forwarded. The sleep races
//! the turn's `AbortToken` so a barge-in drops the chunk instead of
//! releasing it after `TtsCancelled` (spec §4.7 "the paced-send loop (C1)
//! to stop mid-sleep and drop the current frame").
//!
//! Every other outbound message funnels through the same queue so pacing a
//! chunk can never let a later, unpaced message (e.g. `TtsComplete`) race
//! ahead of it on the wire (spec §4.9's per-turn ordering).

use tokio::sync::mpsc;
use tokio::time::Duration;

use vgw_audio::reframer::{Reframer, FRAME_BYTES};
use vgw_core::cancel::AbortToken;

use crate::wire::ServerMessage;

const FRAME_INTERVAL: Duration = Duration::from_millis(10);

enum Job {
    Immediate(ServerMessage),
    TtsChunk { pcm: Vec<u8>, sample_rate: u32, abort: AbortToken, message: ServerMessage },
}

/// Cloneable handle to a connection's paced-send task.
#[derive(Clone)]
pub struct PacedSender {
    tx: mpsc::UnboundedSender<Job>,
}

impl PacedSender {
    /// Enqueue a message for immediate forwarding (no pacing).
    pub fn send(&self, message: ServerMessage) {
        let _ = self.tx.send(Job::Immediate(message));
    }

    /// Enqueue a `TtsChunk` for paced forwarding. `pcm`/`sample_rate` drive
    /// the pacing clock only; `message` (the already-built wire message,
    /// at the TTS provider's native sample rate) is what gets sent.
    pub fn send_tts_chunk(&self, pcm: Vec<u8>, sample_rate: u32, abort: AbortToken, message: ServerMessage) {
        let _ = self.tx.send(Job::TtsChunk { pcm, sample_rate, abort, message });
    }
}

/// Spawn the paced-send task for one connection, forwarding released
/// messages onto `out_tx` in FIFO order.
pub fn spawn(out_tx: mpsc::UnboundedSender<ServerMessage>) -> PacedSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let released = match job {
                Job::Immediate(message) => Some(message),
                Job::TtsChunk { pcm, sample_rate, abort, message } => {
                    if pace(&pcm, sample_rate, &abort).await {
                        Some(message)
                    } else {
                        None
                    }
                }
            };
            if let Some(message) = released {
                if out_tx.send(message).is_err() {
                    break;
                }
            }
        }
    });
    PacedSender { tx }
}

/// Reframe `pcm` into 10 ms/48 kHz frames and sleep one interval per frame,
/// cancelable on `abort` (spec §5 "outbound pacer sleep must be cancelable
/// on a sub-10 ms budget"). Returns `false` if cancelled before pacing
/// finished: the caller must drop the chunk, not forward it.
async fn pace(pcm: &[u8], sample_rate: u32, abort: &AbortToken) -> bool {
    let mut reframer = Reframer::new();
    let mut frames = reframer.feed_chunk(pcm, sample_rate);
    if let Some(tail) = reframer.flush() {
        frames.push(tail);
    }
    debug_assert!(frames.iter().all(|f| f.len() == FRAME_BYTES));

    for _frame in frames {
        tokio::select! {
            () = tokio::time::sleep(FRAME_INTERVAL) => {}
            () = abort.cancelled() => {
                reframer.abort();
                return false;
            }
        }
    }
    !reframer.is_aborted()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_frames(n: usize) -> Vec<u8> {
        vec![0u8; n * FRAME_BYTES]
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_jobs_forward_unchanged() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let paced = spawn(out_tx);
        paced.send(ServerMessage::TtsStart {});
        let msg = out_rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::TtsStart {}));
    }

    #[tokio::test(start_paused = true)]
    async fn tts_chunk_forwards_once_pacing_completes() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let paced = spawn(out_tx);
        let abort = AbortToken::new();
        paced.send_tts_chunk(pcm_frames(2), 48_000, abort, ServerMessage::TtsComplete {});
        tokio::time::advance(Duration::from_millis(25)).await;
        let msg = out_rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::TtsComplete {}));
    }

    #[tokio::test(start_paused = true)]
    async fn tts_chunk_is_dropped_when_aborted_before_pacing_starts() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let paced = spawn(out_tx);
        let abort = AbortToken::new();
        abort.cancel();
        paced.send_tts_chunk(pcm_frames(2), 48_000, abort, ServerMessage::TtsComplete {});
        paced.send(ServerMessage::TtsCancelled {});
        let msg = out_rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::TtsCancelled {}));
    }

    #[tokio::test(start_paused = true)]
    async fn ordering_preserved_across_a_paced_chunk_and_following_immediate_message() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let paced = spawn(out_tx);
        paced.send_tts_chunk(pcm_frames(1), 48_000, AbortToken::new(), ServerMessage::TtsChunk {
            format: "pcm",
            sample_rate: 24_000,
            data: String::new(),
        });
        paced.send(ServerMessage::TtsComplete {});
        tokio::time::advance(Duration::from_millis(15)).await;
        let first = out_rx.recv().await.unwrap();
        let second = out_rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::TtsChunk { .. }));
        assert!(matches!(second, ServerMessage::TtsComplete {}));
    }
}
