//! Playbook Turn Runner (spec component C6, §4.6): wraps the simple turn
//! pipeline with a two-phase tool loop and stage transition resolution.

use std::time::{Duration, Instant};

use serde_json::json;

use vgw_core::cancel::AbortToken;
use vgw_core::domain::chat::{ConversationState, Message};
use vgw_core::domain::playbook::{Playbook, PlaybookRuntime};
use vgw_core::domain::turn_event::TurnEvent;
use vgw_core::domain::utterance::Utterance;
use vgw_core::error::ErrorCode;
use vgw_core::ports::hooks::ErrorCounters;
use vgw_core::ports::llm::LlmRequest;
use vgw_core::ports::tool::ToolRegistry;

use crate::playbook_engine::{
    apply_transition, effective_config, evaluate_transition, find_llm_decision_transition, validate_explicit_target,
    TransitionContext, PLAYBOOK_TRANSITION_TOOL,
};
use crate::retry::{retry_llm_call, RetryPolicy};
use crate::tool_executor::{execute_tool_calls, ToolExecutorConfig};
use crate::turn_pipeline::{speak_sentence, stream_completion_with_tts, TurnDeps, TurnPipelineConfig};

#[derive(Debug, Clone)]
pub struct PlaybookRunnerConfig {
    pub max_tool_calls_per_turn: usize,
    pub phase1_timeout: Duration,
    pub llm_retries: RetryPolicy,
    pub tool_executor: ToolExecutorConfig,
    pub history_window: usize,
    pub history_trim_limit: usize,
    pub tts_voice: String,
}

impl Default for PlaybookRunnerConfig {
    fn default() -> Self {
        Self {
            max_tool_calls_per_turn: 10,
            phase1_timeout: Duration::from_millis(60_000),
            llm_retries: RetryPolicy::default(),
            tool_executor: ToolExecutorConfig::default(),
            history_window: 8,
            history_trim_limit: 8,
            tts_voice: "default".to_string(),
        }
    }
}

/// Run one playbook-driven turn to completion (spec §4.6). Callers are
/// responsible for holding the session's `turn_lock` for the full call
/// (spec §4.6 "Turn serialization").
pub async fn run_playbook_turn(
    utterance: &Utterance,
    history: &mut ConversationState,
    playbook: &Playbook,
    runtime: &mut PlaybookRuntime,
    registry: &ToolRegistry,
    deps: &TurnDeps,
    config: &PlaybookRunnerConfig,
    abort: &AbortToken,
    error_counters: &ErrorCounters,
    on_event: &mut (dyn FnMut(TurnEvent) + Send),
    custom_predicate: &(dyn Fn(&str) -> bool + Send + Sync),
    fire_hook: &(dyn Fn(&str) + Send + Sync),
) {
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

    let effective = effective_config(playbook, runtime, registry);
    if !history.has_system_prompt() {
        history.set_system_prompt(effective.system_prompt.clone());
    }
    history.push(Message::user(text, utterance.attachments.clone()));
    runtime.turn_count_in_stage += 1;

    let phase1_deadline = Instant::now() + config.phase1_timeout;
    let mut final_text: Option<String> = None;
    let mut last_tool_calls = Vec::new();
    let mut pending_transition: Option<(Option<String>, String)> = None;
    let mut tool_calls_used = 0usize;

    'phase1: while tool_calls_used < config.max_tool_calls_per_turn && Instant::now() < phase1_deadline {
        if abort.is_cancelled() {
            // `BargeInController::barge_in` is the sole emitter of
            // `TtsCancelled` (spec §5 "emit exactly once").
            return;
        }

        let request = LlmRequest {
            messages: history.windowed(config.history_window),
            tools: effective.tools.clone(),
            tool_choice_required: false,
            model_config: effective.model_config.clone(),
        };

        let completion = match retry_llm_call(config.llm_retries, || {
            let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
            let llm = deps.llm.clone();
            let req = request.clone();
            async move { llm.stream_completion(req, tx).await }
        })
        .await
        {
            Ok(c) => c,
            Err(e) => {
                error_counters.record(ErrorCode::LlmError);
                on_event(TurnEvent::error(ErrorCode::LlmError, e.message));
                return;
            }
        };

        if !completion.has_tool_calls() {
            final_text = Some(completion.content);
            break 'phase1;
        }

        history.push(Message::assistant_with_tool_calls(completion.content.clone(), completion.tool_calls.clone()));
        last_tool_calls = completion.tool_calls.clone();
        tool_calls_used += completion.tool_calls.len();

        let mut remaining = Vec::new();
        for call in &completion.tool_calls {
            on_event(TurnEvent::tool_call_start(call));
            if call.name == PLAYBOOK_TRANSITION_TOOL {
                let target = call.arguments.get("target_stage").and_then(|v| v.as_str()).unwrap_or_default();
                match validate_explicit_target(playbook, target) {
                    Ok(()) => {
                        let result = json!({ "transitioned_to": target });
                        on_event(TurnEvent::ToolCallEnd {
                            call_id: call.call_id.clone(),
                            result: Some(result.clone()),
                            error: None,
                            duration_ms: 0,
                        });
                        history.push(Message::tool_result(call.call_id.clone(), call.name.clone(), result.to_string()));
                        pending_transition = Some((Some(call.call_id.clone()), target.to_string()));
                    }
                    Err(msg) => {
                        on_event(TurnEvent::ToolCallEnd {
                            call_id: call.call_id.clone(),
                            result: None,
                            error: Some(msg.clone()),
                            duration_ms: 0,
                        });
                        history.push(Message::tool_result(call.call_id.clone(), call.name.clone(), json!({ "error": msg }).to_string()));
                    }
                }
                break;
            }
            remaining.push(call.clone());
        }

        if pending_transition.is_none() && !remaining.is_empty() {
            let results = execute_tool_calls(registry, &remaining, config.tool_executor, abort).await;
            for r in &results {
                on_event(TurnEvent::ToolCallEnd {
                    call_id: r.call_id.clone(),
                    result: r.result.clone(),
                    error: r.error.clone(),
                    duration_ms: r.duration_ms,
                });
                let content = r.result.clone().map(|v| v.to_string()).unwrap_or_else(|| json!({ "error": r.error }).to_string());
                history.push(Message::tool_result(r.call_id.clone(), r.tool_name.clone(), content));
            }
        }

        if pending_transition.is_some() {
            break 'phase1;
        }
    }

    let now = chrono::Utc::now();
    if let Some((transition_id, target)) = pending_transition.take() {
        let declared = find_llm_decision_transition(playbook, runtime, &target);
        let (data, clear_context) = declared.map_or((None, false), |t| (t.data.clone(), t.clear_context));
        let from = runtime.current_stage.clone();
        apply_transition(playbook, runtime, transition_id, &target, "explicit llm transition", data.as_ref(), clear_context, now, fire_hook);
        on_event(TurnEvent::StageChange { from, to: target, reason: "explicit".to_string() });
    } else {
        let ctx = TransitionContext { last_assistant_text: final_text.clone().unwrap_or_default(), last_tool_calls, ..Default::default() };
        if let Some(t) = evaluate_transition(playbook, runtime, &ctx, now, custom_predicate) {
            let (id, target, reason, data, clear_context) =
                (t.id.clone(), t.target.clone(), t.description.clone(), t.data.clone(), t.clear_context);
            let from = runtime.current_stage.clone();
            apply_transition(playbook, runtime, Some(id), &target, &reason, data.as_ref(), clear_context, now, fire_hook);
            on_event(TurnEvent::StageChange { from, to: target, reason });
        }
    }

    // Phase 2 uses the (possibly just-transitioned-to) stage's model config.
    let effective = effective_config(playbook, runtime, registry);
    let tts_config = TurnPipelineConfig {
        history_window: config.history_window,
        history_trim_limit: config.history_trim_limit,
        system_prompt: None,
        tts_voice: config.tts_voice.clone(),
    };

    let final_answer = if let Some(text) = final_text {
        history.push(Message::assistant(text.clone()));
        history.trim_to(config.history_trim_limit);
        on_event(TurnEvent::LlmDelta { content: text.clone(), done: false });
        on_event(TurnEvent::LlmDelta { content: String::new(), done: true });
        on_event(TurnEvent::LlmFinal { full_text: text.clone() });

        let mut tts_started = false;
        for sentence in crate::sentence_split::split_sentences(&text) {
            if abort.is_cancelled() {
                break;
            }
            let trimmed = sentence.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !tts_started {
                tts_started = true;
                on_event(TurnEvent::TtsStart);
            }
            speak_sentence(&deps.tts, trimmed, &tts_config, error_counters, abort, on_event).await;
        }
        if tts_started && !abort.is_cancelled() {
            on_event(TurnEvent::TtsComplete);
        }
        text
    } else {
        let request = LlmRequest {
            messages: history.windowed(config.history_window),
            tools: Vec::new(),
            tool_choice_required: false,
            model_config: effective.model_config.clone(),
        };
        let Some((completion, tts_started)) =
            stream_completion_with_tts(deps, request, &tts_config, abort, error_counters, on_event).await
        else {
            return;
        };
        history.push(Message::assistant(completion.content.clone()));
        history.trim_to(config.history_trim_limit);
        on_event(TurnEvent::LlmFinal { full_text: completion.content.clone() });
        if tts_started && !abort.is_cancelled() {
            on_event(TurnEvent::TtsComplete);
        }
        completion.content
    };

    let ctx = TransitionContext { last_assistant_text: final_answer, ..Default::default() };
    if let Some(t) = evaluate_transition(playbook, runtime, &ctx, chrono::Utc::now(), custom_predicate) {
        let (id, target, reason, data, clear_context) =
            (t.id.clone(), t.target.clone(), t.description.clone(), t.data.clone(), t.clear_context);
        let from = runtime.current_stage.clone();
        apply_transition(playbook, runtime, Some(id), &target, &reason, data.as_ref(), clear_context, chrono::Utc::now(), fire_hook);
        on_event(TurnEvent::StageChange { from, to: target, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use vgw_core::domain::chat::ToolCall;
    use vgw_core::domain::playbook::{ModelConfig, Stage, ToolChoicePolicy};
    use vgw_core::error::GatewayError;
    use vgw_core::ports::llm::{LlmCompletion, LlmDelta, LlmPort};
    use vgw_core::ports::stt::SttPort;
    use vgw_core::ports::tts::{TtsAudio, TtsPort};

    struct EchoStt(String);
    #[async_trait]
    impl SttPort for EchoStt {
        async fn transcribe(&self, _wav_bytes: &[u8]) -> Result<String, GatewayError> {
            Ok(self.0.clone())
        }
    }

    struct StubTts;
    #[async_trait]
    impl TtsPort for StubTts {
        async fn synthesize(&self, text: &str, _voice: &str) -> Result<TtsAudio, GatewayError> {
            Ok(TtsAudio { pcm: vec![0u8; text.len()], sample_rate: 24_000 })
        }
    }

    /// Calls the transition tool on the first turn, then answers plainly.
    struct TransitionThenAnswerLlm;
    #[async_trait]
    impl LlmPort for TransitionThenAnswerLlm {
        async fn stream_completion(
            &self,
            request: LlmRequest,
            deltas: tokio::sync::mpsc::UnboundedSender<LlmDelta>,
        ) -> Result<LlmCompletion, GatewayError> {
            let already_transitioned = request.messages.iter().any(|m| m.role == vgw_core::domain::chat::MessageRole::Tool);
            if already_transitioned {
                let _ = deltas.send(LlmDelta::Content("All set.".to_string()));
                Ok(LlmCompletion { content: "All set.".to_string(), tool_calls: vec![] })
            } else {
                Ok(LlmCompletion {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        call_id: "c1".into(),
                        name: PLAYBOOK_TRANSITION_TOOL.into(),
                        arguments: json!({ "target_stage": "weather" }),
                    }],
                })
            }
        }
    }

    fn stage(id: &str) -> Stage {
        Stage {
            id: id.into(),
            name: id.into(),
            system_prompt: format!("stage {id}"),
            tools: vec![],
            tool_choice: ToolChoicePolicy::Auto,
            model_config: ModelConfig::default(),
            max_turns: None,
            timeout_ms: None,
            on_exit: None,
            on_enter: None,
        }
    }

    fn playbook() -> Playbook {
        Playbook {
            initial_stage: "greet".into(),
            stages: vec![stage("greet"), stage("weather")],
            transitions: vec![],
            global_tools: vec![],
            global_prompt: None,
            default_model_config: ModelConfig::default(),
        }
    }

    fn utterance() -> Utterance {
        Utterance { wav_bytes: vec![], speech_start_time: chrono::Utc::now(), speech_end_time: chrono::Utc::now(), attachments: vec![] }
    }

    #[tokio::test]
    async fn explicit_transition_tool_call_switches_stage_and_continues_turn() {
        let deps = TurnDeps {
            stt: Arc::new(EchoStt("switch to weather please".to_string())),
            llm: Arc::new(TransitionThenAnswerLlm),
            tts: Arc::new(StubTts),
        };
        let playbook = playbook();
        let mut runtime = PlaybookRuntime::new("greet");
        let registry = ToolRegistry::new();
        let mut history = ConversationState::new();
        let mut events = Vec::new();

        run_playbook_turn(
            &utterance(),
            &mut history,
            &playbook,
            &mut runtime,
            &registry,
            &deps,
            &PlaybookRunnerConfig::default(),
            &AbortToken::new(),
            &ErrorCounters::new(),
            &mut |e| events.push(e),
            &|_| false,
            &|_| {},
        )
        .await;

        assert_eq!(runtime.current_stage, "weather");
        assert!(events.iter().any(|e| matches!(e, TurnEvent::StageChange { to, .. } if to == "weather")));
        assert!(matches!(events.last(), Some(TurnEvent::TtsComplete)));
    }

    #[tokio::test]
    async fn empty_transcript_skips_tool_loop() {
        let deps =
            TurnDeps { stt: Arc::new(EchoStt(String::new())), llm: Arc::new(TransitionThenAnswerLlm), tts: Arc::new(StubTts) };
        let playbook = playbook();
        let mut runtime = PlaybookRuntime::new("greet");
        let registry = ToolRegistry::new();
        let mut history = ConversationState::new();
        let mut events = Vec::new();

        run_playbook_turn(
            &utterance(),
            &mut history,
            &playbook,
            &mut runtime,
            &registry,
            &deps,
            &PlaybookRunnerConfig::default(),
            &AbortToken::new(),
            &ErrorCounters::new(),
            &mut |e| events.push(e),
            &|_| false,
            &|_| {},
        )
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TurnEvent::TtsComplete));
    }
}
