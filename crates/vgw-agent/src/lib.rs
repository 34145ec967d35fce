//! Turn pipeline, playbook engine, and barge-in controller.
//!
//! Depends only on `vgw-core` — no transport, no provider, no storage
//! concern lives here (mirrors `gglib-agent`'s boundary against
//! `gglib-core`).

pub mod barge_in;
pub mod playbook_engine;
pub mod playbook_runner;
pub mod retry;
pub mod sentence_split;
pub mod tool_executor;
pub mod turn_pipeline;

pub use barge_in::BargeInController;
pub use playbook_runner::{run_playbook_turn, PlaybookRunnerConfig};
pub use retry::{retry_llm_call, RetryPolicy};
pub use tool_executor::{execute_tool_calls, ToolExecutionResult, ToolExecutorConfig};
pub use turn_pipeline::{run_llm_and_tts, run_turn, stream_completion_with_tts, TurnDeps, TurnPipelineConfig};
