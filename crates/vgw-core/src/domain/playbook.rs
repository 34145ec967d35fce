//! Playbook domain types (spec §3 `Playbook`, `PlaybookRuntime`).
//!
//! This module only holds data and structural validation. The transition
//! *evaluation* and *effective prompt/tool/config* logic (spec §4.5) is a
//! behavior that operates on these types — it lives in `vgw-agent`, which
//! depends on this crate the way `gglib-agent` depends on `gglib-core`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A per-stage (or global default) model configuration override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model_id: Option<String>,
}

impl ModelConfig {
    /// Merge `override_cfg` onto `self`, overridden fields winning
    /// (spec §4.5 "effective model config: default ⊕ stage_overrides").
    #[must_use]
    pub fn merge(&self, override_cfg: &Self) -> Self {
        Self {
            temperature: override_cfg.temperature.or(self.temperature),
            max_tokens: override_cfg.max_tokens.or(self.max_tokens),
            model_id: override_cfg.model_id.clone().or_else(|| self.model_id.clone()),
        }
    }
}

/// Tool-choice policy for a stage's LLM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoicePolicy {
    #[default]
    Auto,
    Required,
    None,
}

/// A named stage in a playbook (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub tool_choice: ToolChoicePolicy,
    #[serde(default)]
    pub model_config: ModelConfig,
    pub max_turns: Option<u32>,
    pub timeout_ms: Option<u64>,
    /// Name of a hook fired when a turn transitions away from this stage
    /// (spec §3 "entry/exit hooks", §4.5 "fire `onExit(from)`"). The hook
    /// body lives outside the playbook definition, resolved by name at fire
    /// time (mirrors `TransitionCondition::Custom`'s predicate-by-name).
    #[serde(default)]
    pub on_exit: Option<String>,
    /// Name of a hook fired when a turn transitions into this stage (spec
    /// §4.5 "fire `onEnter(to)`").
    #[serde(default)]
    pub on_enter: Option<String>,
}

/// A condition that gates a [`Transition`] (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCondition {
    ToolCall { name: String },
    Intent { intent: String, min_confidence: Option<f32> },
    Keyword { keywords: Vec<String> },
    LlmDecision,
    MaxTurns { turns: u32 },
    Timeout { ms: u64 },
    /// A user-supplied predicate, identified by name and evaluated by the
    /// engine (spec's `custom(predicate)` — the predicate body is supplied
    /// out of band by the host application, not serialized here).
    Custom { predicate: String },
}

/// A rule moving the playbook runtime from one stage to another (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    /// Source stage id, or `"*"` for wildcard (any stage).
    pub from: String,
    pub condition: TransitionCondition,
    pub target: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub clear_context: bool,
    #[serde(default)]
    pub priority: i32,
    /// Human-readable description used in the LLM-decision prompt appendix
    /// (spec §4.5 "`target_stage: description`").
    #[serde(default)]
    pub description: String,
}

/// A read-only playbook definition (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub initial_stage: String,
    pub stages: Vec<Stage>,
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub global_tools: Vec<String>,
    #[serde(default)]
    pub global_prompt: Option<String>,
    #[serde(default)]
    pub default_model_config: ModelConfig,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlaybookValidationError {
    #[error("initial stage '{0}' does not exist")]
    MissingInitialStage(String),
    #[error("duplicate stage id '{0}'")]
    DuplicateStageId(String),
    #[error("duplicate transition id '{0}'")]
    DuplicateTransitionId(String),
    #[error("transition '{0}' source stage '{1}' does not resolve")]
    UnresolvedSource(String, String),
    #[error("transition '{0}' target stage '{1}' does not resolve")]
    UnresolvedTarget(String, String),
}

impl Playbook {
    /// Validate structural invariants (spec §3, §8: "Playbook validation
    /// accepts a playbook iff all declared ids are unique and all
    /// referenced ids resolve").
    pub fn validate(&self) -> Result<(), PlaybookValidationError> {
        let mut stage_ids = std::collections::HashSet::new();
        for stage in &self.stages {
            if !stage_ids.insert(stage.id.as_str()) {
                return Err(PlaybookValidationError::DuplicateStageId(stage.id.clone()));
            }
        }

        if !stage_ids.contains(self.initial_stage.as_str()) {
            return Err(PlaybookValidationError::MissingInitialStage(self.initial_stage.clone()));
        }

        let mut transition_ids = std::collections::HashSet::new();
        for transition in &self.transitions {
            if !transition_ids.insert(transition.id.as_str()) {
                return Err(PlaybookValidationError::DuplicateTransitionId(transition.id.clone()));
            }
            if transition.from != "*" && !stage_ids.contains(transition.from.as_str()) {
                return Err(PlaybookValidationError::UnresolvedSource(
                    transition.id.clone(),
                    transition.from.clone(),
                ));
            }
            if !stage_ids.contains(transition.target.as_str()) {
                return Err(PlaybookValidationError::UnresolvedTarget(
                    transition.id.clone(),
                    transition.target.clone(),
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }
}

/// A historical transition record (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub transition_id: Option<String>,
    pub from: String,
    pub to: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Mutable playbook execution state attached to a session (spec §3).
#[derive(Debug, Clone)]
pub struct PlaybookRuntime {
    pub current_stage: String,
    pub turn_count_in_stage: u32,
    pub stage_entered_at: DateTime<Utc>,
    pub context: HashMap<String, Value>,
    pub transition_history: Vec<TransitionRecord>,
}

impl PlaybookRuntime {
    #[must_use]
    pub fn new(initial_stage: impl Into<String>) -> Self {
        Self {
            current_stage: initial_stage.into(),
            turn_count_in_stage: 0,
            stage_entered_at: Utc::now(),
            context: HashMap::new(),
            transition_history: Vec::new(),
        }
    }
}
