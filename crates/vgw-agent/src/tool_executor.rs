//! Tool registry executor (spec §4.6.1).
//!
//! Groups a turn's requested tool calls by execution policy, running
//! `sequential` tools first in input order, then `parallel` tools with a
//! bounded worker pool, each under a per-tool timeout combined with the
//! turn's external abort signal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;

use vgw_core::cancel::AbortToken;
use vgw_core::domain::chat::ToolCall;
use vgw_core::ports::tool::{validate_arguments, ExecutionPolicy, ToolRegistry};

#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub call_id: String,
    pub tool_name: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolExecutorConfig {
    pub max_concurrency: usize,
    pub per_call_timeout: Duration,
    /// Check call arguments against the tool's schema before invoking the
    /// handler (spec §4.6.1 "Validation: if enabled...").
    pub validate_arguments: bool,
}

impl Default for ToolExecutorConfig {
    fn default() -> Self {
        Self { max_concurrency: 10, per_call_timeout: Duration::from_millis(30_000), validate_arguments: true }
    }
}

/// Execute `calls` against `registry` under `config`, honoring `abort`
/// (spec §4.6.1, §5).
pub async fn execute_tool_calls(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    config: ToolExecutorConfig,
    abort: &AbortToken,
) -> Vec<ToolExecutionResult> {
    let mut sequential = Vec::new();
    let mut parallel = Vec::new();

    for call in calls {
        // Unregistered tools are treated as parallel so they still surface
        // a "missing tool" result instead of stalling the sequential queue.
        match registry.policy_of(&call.name).unwrap_or(ExecutionPolicy::Parallel) {
            ExecutionPolicy::Sequential => sequential.push(call.clone()),
            ExecutionPolicy::Parallel => parallel.push(call.clone()),
        }
    }

    let mut results = Vec::with_capacity(calls.len());
    for call in sequential {
        results.push(run_one(registry, call, config.per_call_timeout, config.validate_arguments, abort).await);
    }

    if !parallel.is_empty() {
        let mut in_flight = FuturesUnordered::new();
        let mut queue = parallel.into_iter();
        for call in queue.by_ref().take(config.max_concurrency) {
            in_flight.push(run_one(registry, call, config.per_call_timeout, config.validate_arguments, abort));
        }
        while let Some(result) = in_flight.next().await {
            results.push(result);
            if let Some(next_call) = queue.next() {
                in_flight.push(run_one(registry, next_call, config.per_call_timeout, config.validate_arguments, abort));
            }
        }
    }

    results
}

async fn run_one(
    registry: &ToolRegistry,
    call: ToolCall,
    timeout: Duration,
    validate: bool,
    abort: &AbortToken,
) -> ToolExecutionResult {
    let started = Instant::now();
    let Some(handler) = registry.get(&call.name) else {
        return ToolExecutionResult {
            call_id: call.call_id.clone(),
            tool_name: call.name.clone(),
            success: false,
            result: None,
            error: Some(format!("unknown tool '{}'", call.name)),
            duration_ms: 0,
        };
    };

    if validate {
        if let Err(e) = validate_arguments(&handler.spec().parameters_schema, &call.arguments) {
            return ToolExecutionResult {
                call_id: call.call_id.clone(),
                tool_name: call.name.clone(),
                success: false,
                result: None,
                error: Some(e),
                duration_ms: started.elapsed().as_millis() as u64,
            };
        }
    }

    let local_abort = abort.child_token();
    let handler: Arc<dyn vgw_core::ports::tool::ToolHandler> = handler;
    let (success, result, error) = tokio::select! {
        outcome = handler.execute(call.arguments.clone()) => match outcome {
            Ok(value) => (true, Some(value), None),
            Err(e) => (false, None, Some(e.message)),
        },
        () = tokio::time::sleep(timeout) => (false, None, Some("tool call timed out".to_string())),
        () = local_abort.cancelled() => (false, None, Some("tool call aborted".to_string())),
    };

    ToolExecutionResult {
        call_id: call.call_id.clone(),
        tool_name: call.name.clone(),
        success,
        result,
        error,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vgw_core::error::GatewayError;
    use vgw_core::ports::tool::ToolSpec;

    struct Echo;

    #[async_trait]
    impl vgw_core::ports::tool::ToolHandler for Echo {
        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "echo".into(), description: String::new(), parameters_schema: Value::Null }
        }
        async fn execute(&self, arguments: Value) -> Result<Value, GatewayError> {
            Ok(arguments)
        }
    }

    struct Slow;

    #[async_trait]
    impl vgw_core::ports::tool::ToolHandler for Slow {
        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "slow".into(), description: String::new(), parameters_schema: Value::Null }
        }
        async fn execute(&self, _arguments: Value) -> Result<Value, GatewayError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_invoking_handler() {
        let registry = ToolRegistry::new();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "missing".into(), arguments: Value::Null }];
        let results =
            execute_tool_calls(&registry, &calls, ToolExecutorConfig::default(), &AbortToken::new()).await;
        assert!(!results[0].success);
    }

    #[tokio::test]
    async fn registered_tool_executes_and_returns_result() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo)).unwrap();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "echo".into(), arguments: serde_json::json!({"x": 1}) }];
        let results =
            execute_tool_calls(&registry, &calls, ToolExecutorConfig::default(), &AbortToken::new()).await;
        assert!(results[0].success);
        assert_eq!(results[0].result, Some(serde_json::json!({"x": 1})));
    }

    struct CountingEcho(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    #[async_trait]
    impl vgw_core::ports::tool::ToolHandler for CountingEcho {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "weather".into(),
                description: String::new(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"],
                }),
            }
        }
        async fn execute(&self, arguments: Value) -> Result<Value, GatewayError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn invalid_arguments_fail_without_invoking_handler() {
        let calls_made = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingEcho(calls_made.clone()))).unwrap();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "weather".into(), arguments: serde_json::json!({}) }];
        let results = execute_tool_calls(&registry, &calls, ToolExecutorConfig::default(), &AbortToken::new()).await;
        assert!(!results[0].success);
        assert_eq!(calls_made.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_arguments_invoke_handler() {
        let calls_made = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CountingEcho(calls_made.clone()))).unwrap();
        let calls =
            vec![ToolCall { call_id: "c1".into(), name: "weather".into(), arguments: serde_json::json!({"city": "Rome"}) }];
        let results = execute_tool_calls(&registry, &calls, ToolExecutorConfig::default(), &AbortToken::new()).await;
        assert!(results[0].success);
        assert_eq!(calls_made.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn per_call_timeout_fails_a_hanging_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Slow)).unwrap();
        let calls = vec![ToolCall { call_id: "c1".into(), name: "slow".into(), arguments: Value::Null }];
        let config = ToolExecutorConfig { per_call_timeout: Duration::from_millis(10), ..Default::default() };
        let results = execute_tool_calls(&registry, &calls, config, &AbortToken::new()).await;
        assert!(!results[0].success);
    }
}
