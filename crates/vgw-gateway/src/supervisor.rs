//! Per-Connection Supervisor (spec component C9, §4.9).
//!
//! One instance per inbound WebSocket connection. Mirrors the split
//! ingest/egress task shape of `gglib-axum::handlers::voice_ws::handle_audio_ws`,
//! adapted to a single JSON control channel instead of a binary audio
//! socket: this gateway never negotiates real peer media (see
//! `DESIGN.md`), so every utterance arrives over the `audio` control
//! message (spec §4.9 "fallback") and every `TurnEvent` is mirrored back
//! over the same channel (never split to a peer data channel, since none
//! exists).

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use vgw_agent::{run_playbook_turn, run_turn, BargeInController, PlaybookRunnerConfig, TurnDeps, TurnPipelineConfig};
use vgw_core::cancel::AbortToken;
use vgw_core::domain::playbook::{Playbook, PlaybookRuntime};
use vgw_core::domain::session::Session;
use vgw_core::domain::turn_event::TurnEvent;
use vgw_core::domain::utterance::{Utterance, VisionAttachment};
use vgw_core::error::ErrorCode;
use vgw_core::ports::hooks::{ErrorCounters, TurnHookSink};
use vgw_core::ports::tool::ToolRegistry;

use crate::pacer::{self, PacedSender};
use crate::session_store::SessionStore;
use crate::wire::{ClientMessage, ServerMessage, WireAttachment};

const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);

impl From<WireAttachment> for VisionAttachment {
    fn from(a: WireAttachment) -> Self {
        Self { mime_type: a.mime_type, data: a.data }
    }
}

/// Everything a connection needs to drive turns, shared across every
/// connection the gateway serves.
pub struct SupervisorDeps {
    pub store: Arc<SessionStore>,
    pub turn_deps: Arc<TurnDeps>,
    pub tool_registry: Arc<ToolRegistry>,
    pub playbook: Option<Arc<Playbook>>,
    pub hook_sink: Arc<dyn TurnHookSink>,
    pub error_counters: Arc<ErrorCounters>,
    pub turn_pipeline_config: TurnPipelineConfig,
    pub playbook_runner_config: PlaybookRunnerConfig,
}

pub async fn handle_connection(socket: WebSocket, deps: Arc<SupervisorDeps>) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });
    let paced = pacer::spawn(out_tx);

    let mut session = deps.store.create(Uuid::new_v4().to_string()).await;
    paced.send(ServerMessage::Ready { id: connection_id.clone(), protocol_version: ServerMessage::protocol_version() });
    info!(connection_id, session_id = %session.id, "voice connection ready");

    let barge_in = Arc::new(BargeInController::new());
    let mut heartbeat_deadline = Instant::now() + HEARTBEAT_TIMEOUT;

    loop {
        let remaining = heartbeat_deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            () = tokio::time::sleep(remaining) => {
                warn!(connection_id, "heartbeat timeout, closing connection");
                break;
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    None | Some(Err(_)) => break,
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping { timestamp }) => {
                                heartbeat_deadline = Instant::now() + HEARTBEAT_TIMEOUT;
                                paced.send(ServerMessage::Pong { timestamp });
                            }
                            Ok(ClientMessage::Reconnect { session_id }) => {
                                session = handle_reconnect(&deps, &paced, &session_id).await;
                            }
                            Ok(ClientMessage::Offer { .. } | ClientMessage::Signal { .. }) => {
                                paced.send(ServerMessage::Error {
                                    code: ErrorCode::WebrtcUnavailable,
                                    message: "peer media negotiation is not supported by this gateway".to_string(),
                                });
                            }
                            Ok(ClientMessage::Attachments { attachments }) => {
                                session.queue_vision(attachments.into_iter().map(Into::into).collect()).await;
                            }
                            Ok(ClientMessage::Audio { data, attachments }) => {
                                spawn_turn(&deps, &session, &barge_in, &paced, &data, attachments).await;
                            }
                            Err(e) => {
                                paced.send(ServerMessage::Error {
                                    code: ErrorCode::InvalidMessage,
                                    message: e.to_string(),
                                });
                            }
                        }
                    }
                    Some(Ok(_)) => {} // binary/ping/pong WS frames: no peer audio track to carry
                }
            }
            _ = &mut writer => break,
        }
    }

    barge_in.barge_in(&mut |_| {});
    writer.abort();
    info!(connection_id, session_id = %session.id, "voice connection closed, session retained for reconnect");
}

async fn handle_reconnect(deps: &SupervisorDeps, paced: &PacedSender, session_id: &str) -> Arc<Session> {
    if let Some(existing) = deps.store.get_if_live(session_id).await {
        paced.send(ServerMessage::ReconnectAck {
            success: true,
            session_id: existing.id.clone(),
            history_recovered: true,
        });
        existing
    } else {
        let fresh = deps.store.create(Uuid::new_v4().to_string()).await;
        paced.send(ServerMessage::ReconnectAck {
            success: true,
            session_id: fresh.id.clone(),
            history_recovered: false,
        });
        fresh
    }
}

/// Decode a base64 `audio` control message into a ready [`Utterance`] and
/// run a turn for it (spec §4.9 fallback path, bypassing C1/C2/C3). A new
/// `audio` message arriving while a turn is in flight is this gateway's
/// stand-in for "speech-start" (no real peer VAD exists to fire it), so it
/// barges in on any turn already running for this connection (spec §4.7).
async fn spawn_turn(
    deps: &Arc<SupervisorDeps>,
    session: &Arc<Session>,
    barge_in: &Arc<BargeInController>,
    paced: &PacedSender,
    data: &str,
    message_attachments: Vec<WireAttachment>,
) {
    let Ok(pcm) = base64::engine::general_purpose::STANDARD.decode(data) else {
        paced.send(ServerMessage::Error {
            code: ErrorCode::InvalidMessage,
            message: "audio.data is not valid base64".to_string(),
        });
        return;
    };

    let mut attachments: Vec<VisionAttachment> = session.drain_vision().await;
    attachments.extend(message_attachments.into_iter().map(VisionAttachment::from));

    let now = chrono::Utc::now();
    let utterance = Utterance { wav_bytes: Utterance::wav_wrap(&pcm), speech_start_time: now, speech_end_time: now, attachments };

    barge_in.barge_in(&mut |event: TurnEvent| {
        deps.hook_sink.on_event(&session.id, &event);
        paced.send(ServerMessage::from(&event));
    });

    let deps = deps.clone();
    let session = session.clone();
    let barge_in = barge_in.clone();
    let paced = paced.clone();

    tokio::spawn(async move {
        let _permit = session.turn_lock.lock().await;
        let abort = AbortToken::new();
        barge_in.begin_turn(abort.clone());

        let mut on_event = |event: TurnEvent| {
            deps.hook_sink.on_event(&session.id, &event);
            if let TurnEvent::TtsChunk { pcm, sample_rate, .. } = &event {
                paced.send_tts_chunk(pcm.clone(), *sample_rate, abort.clone(), ServerMessage::from(&event));
            } else {
                paced.send(ServerMessage::from(&event));
            }
        };

        let mut history = session.history.lock().await;

        if let Some(playbook) = deps.playbook.clone() {
            let mut runtime_slot = session.playbook.lock().await;
            let runtime = runtime_slot.get_or_insert_with(|| PlaybookRuntime::new(playbook.initial_stage.clone()));
            run_playbook_turn(
                &utterance,
                &mut history,
                &playbook,
                runtime,
                &deps.tool_registry,
                &deps.turn_deps,
                &deps.playbook_runner_config,
                &abort,
                &deps.error_counters,
                &mut on_event,
                &|_| false,
                &|_| {},
            )
            .await;
        } else {
            run_turn(&utterance, &mut history, &deps.turn_deps, &deps.turn_pipeline_config, &abort, &deps.error_counters, &mut on_event)
                .await;
        }

        barge_in.end_turn();
    });
}
