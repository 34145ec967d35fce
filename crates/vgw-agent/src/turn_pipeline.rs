//! Turn Pipeline — simple (spec component C4, §4.4).
//!
//! `run_turn` emits [`TurnEvent`]s through `on_event` as it produces them —
//! the caller (the per-connection supervisor) is the "dedicated turn task"
//! boundary spec §9 describes; this function is what runs inside it.
//! Outbound audio reframing/pacing (C1) happens downstream of `TTSChunk`,
//! in the supervisor that owns the peer-media sink — this pipeline only
//! produces PCM at the TTS provider's native rate.

use std::sync::Arc;

use vgw_core::cancel::AbortToken;
use vgw_core::domain::chat::{ConversationState, Message};
use vgw_core::domain::turn_event::TurnEvent;
use vgw_core::domain::utterance::{Utterance, VisionAttachment};
use vgw_core::error::ErrorCode;
use vgw_core::ports::hooks::ErrorCounters;
use vgw_core::ports::llm::{LlmCompletion, LlmDelta, LlmPort, LlmRequest};
use vgw_core::ports::stt::SttPort;
use vgw_core::ports::tts::TtsPort;

use crate::sentence_split::extract_complete_sentence;

#[derive(Debug, Clone)]
pub struct TurnPipelineConfig {
    /// Messages of window kept when building the LLM request (spec §4.4:
    /// "the last N non-system messages, default 8").
    pub history_window: usize,
    /// `limit` in the post-append trim check (spec §4.4: "exceeds `limit +
    /// 2`").
    pub history_trim_limit: usize,
    pub system_prompt: Option<String>,
    pub tts_voice: String,
}

impl Default for TurnPipelineConfig {
    fn default() -> Self {
        Self { history_window: 8, history_trim_limit: 8, system_prompt: None, tts_voice: "default".to_string() }
    }
}

pub struct TurnDeps {
    pub stt: Arc<dyn SttPort>,
    pub llm: Arc<dyn LlmPort>,
    pub tts: Arc<dyn TtsPort>,
}

/// Run one simple (non-playbook) turn to completion (spec §4.4).
pub async fn run_turn(
    utterance: &Utterance,
    history: &mut ConversationState,
    deps: &TurnDeps,
    config: &TurnPipelineConfig,
    abort: &AbortToken,
    error_counters: &ErrorCounters,
    on_event: &mut (dyn FnMut(TurnEvent) + Send),
) {
    // Step A — STT.
    let text = match deps.stt.transcribe(&utterance.wav_bytes).await {
        Ok(t) => t,
        Err(e) => {
            error_counters.record(ErrorCode::SttError);
            on_event(TurnEvent::error(ErrorCode::SttError, e.message));
            return;
        }
    };
    on_event(TurnEvent::Transcript { text: text.clone(), is_final: true });

    if text.trim().is_empty() {
        on_event(TurnEvent::TtsComplete);
        return;
    }

    run_llm_and_tts(
        &text,
        utterance.attachments.clone(),
        history,
        deps,
        config,
        abort,
        error_counters,
        on_event,
    )
    .await;
}

/// Step B + Step C: append the user turn, stream the LLM reply with
/// sentence-boundary TTS dispatch, trim history (spec §4.4).
pub async fn run_llm_and_tts(
    user_text: &str,
    attachments: Vec<VisionAttachment>,
    history: &mut ConversationState,
    deps: &TurnDeps,
    config: &TurnPipelineConfig,
    abort: &AbortToken,
    error_counters: &ErrorCounters,
    on_event: &mut (dyn FnMut(TurnEvent) + Send),
) {
    if !history.has_system_prompt() {
        if let Some(prompt) = &config.system_prompt {
            history.set_system_prompt(prompt.clone());
        }
    }
    history.push(Message::user(user_text, attachments));

    let request = LlmRequest {
        messages: history.windowed(config.history_window),
        tools: Vec::new(),
        tool_choice_required: false,
        model_config: vgw_core::domain::playbook::ModelConfig::default(),
    };

    let Some((completion, tts_started)) =
        stream_completion_with_tts(deps, request, config, abort, error_counters, on_event).await
    else {
        return;
    };

    history.push(Message::assistant(completion.content.clone()));
    history.trim_to(config.history_trim_limit);
    on_event(TurnEvent::LlmFinal { full_text: completion.content });
    if tts_started && !abort.is_cancelled() {
        on_event(TurnEvent::TtsComplete);
    }
}

/// Drive one LLM streaming call, dispatching TTS at each sentence boundary
/// as deltas arrive (spec §4.4 Step B/C). Returns `None` if the call failed
/// (an `Error` event has already been emitted). The caller is responsible
/// for emitting `LLMFinal` before `TTSComplete` (the returned `bool`
/// indicates whether TTS was started and `TTSComplete` is owed).
pub async fn stream_completion_with_tts(
    deps: &TurnDeps,
    request: LlmRequest,
    config: &TurnPipelineConfig,
    abort: &AbortToken,
    error_counters: &ErrorCounters,
    on_event: &mut (dyn FnMut(TurnEvent) + Send),
) -> Option<(LlmCompletion, bool)> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let llm = deps.llm.clone();
    let call = tokio::spawn(async move { llm.stream_completion(request, tx).await });

    let mut assembled = String::new();
    let mut pending = String::new();
    let mut tts_started = false;
    let mut first_token_seen = false;

    loop {
        tokio::select! {
            biased;
            () = abort.cancelled() => {
                call.abort();
                break;
            }
            delta = rx.recv() => {
                let Some(delta) = delta else { break };
                if let LlmDelta::Content(content) = delta {
                    if !content.is_empty() && !first_token_seen {
                        first_token_seen = true;
                        tracing::debug!("time-to-first-token reached");
                    }
                    on_event(TurnEvent::LlmDelta { content: content.clone(), done: false });
                    assembled.push_str(&content);
                    pending.push_str(&content);
                    while let Some(sentence) = extract_complete_sentence(&mut pending) {
                        let trimmed = sentence.trim().to_string();
                        if trimmed.is_empty() {
                            continue;
                        }
                        if !tts_started {
                            tts_started = true;
                            on_event(TurnEvent::TtsStart);
                        }
                        speak_sentence(&deps.tts, &trimmed, config, error_counters, abort, on_event).await;
                        if abort.is_cancelled() {
                            break;
                        }
                    }
                }
            }
        }
        if abort.is_cancelled() {
            break;
        }
    }

    if abort.is_cancelled() {
        // The barge-in controller is the sole owner of `TtsCancelled` (spec
        // §5 "emit exactly once") — it already fired on the shared channel
        // when it cancelled this turn's `AbortToken`.
        return None;
    }

    on_event(TurnEvent::LlmDelta { content: String::new(), done: true });

    let completion = match call.await {
        Ok(Ok(c)) => c,
        Ok(Err(e)) => {
            error_counters.record(ErrorCode::LlmError);
            on_event(TurnEvent::error(ErrorCode::LlmError, e.message));
            return None;
        }
        Err(_join_err) => {
            error_counters.record(ErrorCode::LlmError);
            on_event(TurnEvent::error(ErrorCode::LlmError, "llm task panicked"));
            return None;
        }
    };

    let remainder = pending.trim().to_string();
    if !remainder.is_empty() {
        if !tts_started {
            tts_started = true;
            on_event(TurnEvent::TtsStart);
        }
        speak_sentence(&deps.tts, &remainder, config, error_counters, abort, on_event).await;
    }

    let completion = if completion.content.is_empty() { LlmCompletion { content: assembled, ..completion } } else { completion };
    Some((completion, tts_started))
}

/// Synthesize and emit one sentence's `TtsChunk` (spec §4.4 Step C). If
/// `abort` fires while synthesis is in flight, the result is dropped
/// silently: no `TtsChunk` or `Error` follows a `TtsCancelled` (spec §4.7,
/// §5).
pub(crate) async fn speak_sentence(
    tts: &Arc<dyn TtsPort>,
    sentence: &str,
    config: &TurnPipelineConfig,
    error_counters: &ErrorCounters,
    abort: &AbortToken,
    on_event: &mut (dyn FnMut(TurnEvent) + Send),
) {
    let outcome = tts.synthesize(sentence, &config.tts_voice).await;
    if abort.is_cancelled() {
        return;
    }
    match outcome {
        Ok(audio) => {
            on_event(TurnEvent::TtsChunk {
                pcm: audio.pcm,
                sample_rate: audio.sample_rate,
                sentence: sentence.to_string(),
            });
        }
        Err(e) => {
            error_counters.record(ErrorCode::TtsError);
            on_event(TurnEvent::error(ErrorCode::TtsError, e.message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vgw_core::error::GatewayError;
    use vgw_core::ports::tts::TtsAudio;

    struct EchoStt;
    #[async_trait]
    impl SttPort for EchoStt {
        async fn transcribe(&self, _wav_bytes: &[u8]) -> Result<String, GatewayError> {
            Ok("Hello there! How can I help you?".to_string())
        }
    }

    struct EmptyStt;
    #[async_trait]
    impl SttPort for EmptyStt {
        async fn transcribe(&self, _wav_bytes: &[u8]) -> Result<String, GatewayError> {
            Ok(String::new())
        }
    }

    struct ScriptedLlm;
    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn stream_completion(
            &self,
            _request: LlmRequest,
            deltas: tokio::sync::mpsc::UnboundedSender<LlmDelta>,
        ) -> Result<LlmCompletion, GatewayError> {
            for chunk in ["Hello there! ", "How can I help ", "you?"] {
                let _ = deltas.send(LlmDelta::Content(chunk.to_string()));
            }
            Ok(LlmCompletion { content: "Hello there! How can I help you?".to_string(), tool_calls: vec![] })
        }
    }

    struct StubTts;
    #[async_trait]
    impl TtsPort for StubTts {
        async fn synthesize(&self, text: &str, _voice: &str) -> Result<TtsAudio, GatewayError> {
            Ok(TtsAudio { pcm: vec![0u8; text.len()], sample_rate: 24_000 })
        }
    }

    fn utterance(wav: &[u8]) -> Utterance {
        Utterance { wav_bytes: wav.to_vec(), speech_start_time: chrono::Utc::now(), speech_end_time: chrono::Utc::now(), attachments: vec![] }
    }

    #[tokio::test]
    async fn empty_transcript_skips_llm_and_tts() {
        let deps = TurnDeps { stt: Arc::new(EmptyStt), llm: Arc::new(ScriptedLlm), tts: Arc::new(StubTts) };
        let mut history = ConversationState::new();
        let mut events = Vec::new();
        run_turn(
            &utterance(b"wav"),
            &mut history,
            &deps,
            &TurnPipelineConfig::default(),
            &AbortToken::new(),
            &ErrorCounters::new(),
            &mut |e| events.push(e),
        )
        .await;

        assert!(matches!(events[0], TurnEvent::Transcript { ref text, is_final: true } if text.is_empty()));
        assert!(matches!(events[1], TurnEvent::TtsComplete));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn simple_turn_emits_transcript_tts_and_final_in_order() {
        let deps = TurnDeps { stt: Arc::new(EchoStt), llm: Arc::new(ScriptedLlm), tts: Arc::new(StubTts) };
        let mut history = ConversationState::new();
        let mut events = Vec::new();
        run_turn(
            &utterance(b"wav"),
            &mut history,
            &deps,
            &TurnPipelineConfig::default(),
            &AbortToken::new(),
            &ErrorCounters::new(),
            &mut |e| events.push(e),
        )
        .await;

        assert!(matches!(events[0], TurnEvent::Transcript { .. }));
        assert!(events.iter().any(|e| matches!(e, TurnEvent::TtsStart)));
        let chunk_count = events.iter().filter(|e| matches!(e, TurnEvent::TtsChunk { .. })).count();
        assert_eq!(chunk_count, 2); // "Hello there!" and "How can I help you?"
        assert!(matches!(events.last(), Some(TurnEvent::TtsComplete)));
        assert_eq!(history.messages().len(), 2); // user + assistant
    }
}
