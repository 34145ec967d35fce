//! Playbook Engine (spec component C5, §4.5).

use vgw_core::domain::chat::ToolCall;
use vgw_core::domain::playbook::{
    ModelConfig, Playbook, PlaybookRuntime, Transition, TransitionCondition, TransitionRecord,
};
use vgw_core::ports::tool::{ToolRegistry, ToolSpec};

pub const PLAYBOOK_TRANSITION_TOOL: &str = "playbook_transition";

/// Context gathered after an LLM call, used to evaluate transitions (spec
/// §4.5).
#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    pub last_assistant_text: String,
    pub last_tool_calls: Vec<ToolCall>,
    pub detected_intent: Option<String>,
    pub intent_confidence: Option<f32>,
}

/// The effective prompt/tools/config for the current stage (spec §4.5).
#[derive(Debug, Clone)]
pub struct EffectiveStageConfig {
    pub system_prompt: String,
    pub tools: Vec<ToolSpec>,
    pub model_config: ModelConfig,
}

/// Compute the effective system prompt: `global_prompt` + stage prompt + an
/// appendix listing applicable `llm_decision` transitions (spec §4.5).
#[must_use]
pub fn effective_prompt(playbook: &Playbook, runtime: &PlaybookRuntime) -> String {
    let mut parts = Vec::new();
    if let Some(global) = &playbook.global_prompt {
        if !global.is_empty() {
            parts.push(global.clone());
        }
    }
    if let Some(stage) = playbook.stage(&runtime.current_stage) {
        if !stage.system_prompt.is_empty() {
            parts.push(stage.system_prompt.clone());
        }
    }

    let appendix: Vec<String> = applicable_transitions(playbook, runtime)
        .into_iter()
        .filter(|t| matches!(t.condition, TransitionCondition::LlmDecision))
        .map(|t| format!("{}: {}", t.target, t.description))
        .collect();
    if !appendix.is_empty() {
        parts.push(appendix.join("\n"));
    }

    parts.join("\n\n")
}

/// Compute the effective tool list: `global_tools ∪ stage_tools`, plus the
/// built-in transition tool when an `llm_decision` transition applies (spec
/// §4.5).
#[must_use]
pub fn effective_tools(playbook: &Playbook, runtime: &PlaybookRuntime, registry: &ToolRegistry) -> Vec<ToolSpec> {
    let mut names: Vec<String> = playbook.global_tools.clone();
    if let Some(stage) = playbook.stage(&runtime.current_stage) {
        for t in &stage.tools {
            if !names.contains(t) {
                names.push(t.clone());
            }
        }
    }
    let mut specs = registry.specs_for(&names);

    let has_llm_decision = applicable_transitions(playbook, runtime)
        .iter()
        .any(|t| matches!(t.condition, TransitionCondition::LlmDecision));
    if has_llm_decision {
        specs.push(ToolSpec {
            name: PLAYBOOK_TRANSITION_TOOL.to_string(),
            description: "Transition the conversation to a different stage.".to_string(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "target_stage": { "type": "string" } },
                "required": ["target_stage"],
            }),
        });
    }
    specs
}

/// Compute the effective model config: `default ⊕ stage_overrides` (spec
/// §4.5).
#[must_use]
pub fn effective_model_config(playbook: &Playbook, runtime: &PlaybookRuntime) -> ModelConfig {
    let stage_override = playbook.stage(&runtime.current_stage).map(|s| s.model_config.clone()).unwrap_or_default();
    playbook.default_model_config.merge(&stage_override)
}

#[must_use]
pub fn effective_config(playbook: &Playbook, runtime: &PlaybookRuntime, registry: &ToolRegistry) -> EffectiveStageConfig {
    EffectiveStageConfig {
        system_prompt: effective_prompt(playbook, runtime),
        tools: effective_tools(playbook, runtime, registry),
        model_config: effective_model_config(playbook, runtime),
    }
}

fn applicable_transitions<'a>(playbook: &'a Playbook, runtime: &PlaybookRuntime) -> Vec<&'a Transition> {
    let mut candidates: Vec<&Transition> = playbook
        .transitions
        .iter()
        .filter(|t| t.from == "*" || t.from == runtime.current_stage)
        .collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates
}

/// Evaluate automatic transitions in priority order, returning the first
/// whose condition matches (spec §4.5).
#[must_use]
pub fn evaluate_transition<'a>(
    playbook: &'a Playbook,
    runtime: &PlaybookRuntime,
    ctx: &TransitionContext,
    now: chrono::DateTime<chrono::Utc>,
    custom: &(dyn Fn(&str) -> bool + Send + Sync),
) -> Option<&'a Transition> {
    applicable_transitions(playbook, runtime).into_iter().find(|t| condition_matches(&t.condition, runtime, ctx, now, custom))
}

fn condition_matches(
    condition: &TransitionCondition,
    runtime: &PlaybookRuntime,
    ctx: &TransitionContext,
    now: chrono::DateTime<chrono::Utc>,
    custom: &(dyn Fn(&str) -> bool + Send + Sync),
) -> bool {
    match condition {
        TransitionCondition::ToolCall { name } => ctx.last_tool_calls.iter().any(|c| &c.name == name),
        TransitionCondition::Intent { intent, min_confidence } => {
            ctx.detected_intent.as_deref() == Some(intent.as_str())
                && min_confidence.is_none_or(|min| ctx.intent_confidence.unwrap_or(0.0) >= min)
        }
        TransitionCondition::Keyword { keywords } => {
            let text = ctx.last_assistant_text.to_lowercase();
            keywords.iter().any(|k| text.contains(&k.to_lowercase()))
        }
        TransitionCondition::LlmDecision => {
            ctx.last_tool_calls.iter().any(|c| c.name == PLAYBOOK_TRANSITION_TOOL)
        }
        TransitionCondition::MaxTurns { turns } => runtime.turn_count_in_stage >= *turns,
        TransitionCondition::Timeout { ms } => {
            (now - runtime.stage_entered_at).num_milliseconds() >= i64::try_from(*ms).unwrap_or(i64::MAX)
        }
        TransitionCondition::Custom { predicate } => custom(predicate),
    }
}

/// Explicit transition requested by the `playbook_transition` tool (spec
/// §4.6 step 3). Rejects an unknown target.
pub fn validate_explicit_target(playbook: &Playbook, target: &str) -> Result<(), String> {
    if playbook.stage(target).is_some() {
        Ok(())
    } else {
        Err(format!("unknown target stage '{target}'"))
    }
}

/// Find the declared `llm_decision` transition (applicable from the current
/// stage) targeting `target`, so an explicit tool-driven transition can
/// still honor its `data`/`clear_context` (spec §4.6 step 3). Returns `None`
/// if no such transition is declared, in which case the caller synthesizes
/// an implicit one.
#[must_use]
pub fn find_llm_decision_transition<'a>(
    playbook: &'a Playbook,
    runtime: &PlaybookRuntime,
    target: &str,
) -> Option<&'a Transition> {
    applicable_transitions(playbook, runtime)
        .into_iter()
        .find(|t| matches!(t.condition, TransitionCondition::LlmDecision) && t.target == target)
}

/// Run a named hook, isolating the rest of the engine from a panicking hook
/// body (spec §7 "Hook failures are caught and logged but never propagate").
fn fire_hook_safely(fire_hook: &(dyn Fn(&str) + Send + Sync), name: &str) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fire_hook(name))).is_err() {
        tracing::warn!(hook = name, "stage hook panicked, ignoring");
    }
}

/// Apply a transition to `runtime` (spec §4.5 "Executing a transition": fire
/// `onExit(from)`, optionally clear context, append to transition history,
/// switch stage, reset turn counters and `stage_entered_at`, merge
/// transition data into context, fire `onEnter(to)`).
#[allow(clippy::too_many_arguments)]
pub fn apply_transition(
    playbook: &Playbook,
    runtime: &mut PlaybookRuntime,
    transition_id: Option<String>,
    to: &str,
    reason: &str,
    data: Option<&serde_json::Value>,
    clear_context: bool,
    now: chrono::DateTime<chrono::Utc>,
    fire_hook: &(dyn Fn(&str) + Send + Sync),
) {
    if let Some(exit_hook) = playbook.stage(&runtime.current_stage).and_then(|s| s.on_exit.as_deref()) {
        fire_hook_safely(fire_hook, exit_hook);
    }

    if clear_context {
        runtime.context.clear();
    }

    let from = std::mem::replace(&mut runtime.current_stage, to.to_string());
    runtime.transition_history.push(TransitionRecord {
        transition_id,
        from,
        to: to.to_string(),
        reason: reason.to_string(),
        at: now,
    });
    runtime.turn_count_in_stage = 0;
    runtime.stage_entered_at = now;

    if let Some(serde_json::Value::Object(map)) = data {
        for (k, v) in map {
            runtime.context.insert(k.clone(), v.clone());
        }
    }

    if let Some(enter_hook) = playbook.stage(to).and_then(|s| s.on_enter.as_deref()) {
        fire_hook_safely(fire_hook, enter_hook);
    }
}
