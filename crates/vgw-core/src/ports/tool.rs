//! Tool registry and execution contract (spec §4.6 "Tool registry and
//! executor", component C6.1).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;

/// A tool's wire-visible schema, passed to the LLM as part of a request.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

/// A single callable tool. Implementors are free to hold their own state
/// (a DB handle, an HTTP client); the registry only holds `Arc<dyn
/// ToolHandler>`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Execute with the LLM-supplied arguments. Implementations should
    /// respect the ambient `tokio` cancellation of their own future —
    /// callers wrap this in a per-tool timeout (spec §4.6 "per-tool
    /// timeout").
    async fn execute(&self, arguments: Value) -> Result<Value, GatewayError>;
}

/// How a turn runner executes a batch of tool calls requested in one LLM
/// turn (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    Sequential,
    Parallel,
}

struct Entry {
    handler: Arc<dyn ToolHandler>,
    policy: ExecutionPolicy,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("tool '{0}' is already registered")]
pub struct DuplicateToolError(pub String);

/// Lookup table of tools available to a stage (spec §3 `global_tools` ⊕
/// `stage.tools`). Read-mostly after initialization (spec §5).
#[derive(Default, Clone)]
pub struct ToolRegistry {
    entries: HashMap<String, Arc<Entry>>,
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Self { handler: self.handler.clone(), policy: self.policy }
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with the default policy (parallel, spec §4.6.1).
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), DuplicateToolError> {
        self.register_with_policy(handler, ExecutionPolicy::Parallel)
    }

    pub fn register_with_policy(
        &mut self,
        handler: Arc<dyn ToolHandler>,
        policy: ExecutionPolicy,
    ) -> Result<(), DuplicateToolError> {
        let name = handler.spec().name.clone();
        if self.entries.contains_key(&name) {
            return Err(DuplicateToolError(name));
        }
        self.entries.insert(name, Arc::new(Entry { handler, policy }));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.entries.get(name).map(|e| e.handler.clone())
    }

    #[must_use]
    pub fn policy_of(&self, name: &str) -> Option<ExecutionPolicy> {
        self.entries.get(name).map(|e| e.policy)
    }

    /// Specs for the given tool names, in order, silently skipping any name
    /// that isn't registered (spec §4.5: a stage may reference a tool by
    /// name; the engine resolves it against the registry at call time).
    #[must_use]
    pub fn specs_for(&self, names: &[String]) -> Vec<ToolSpec> {
        names.iter().filter_map(|n| self.entries.get(n)).map(|e| e.handler.spec()).collect()
    }
}

/// Validate `arguments` against a JSON-Schema-subset `schema` (spec §4.6.1:
/// "type, required, enum, integer-vs-number"). Only `object`-typed schemas
/// with a `properties`/`required` shape are meaningfully checked; any other
/// schema (including `Value::Null`, used by tools that take no arguments)
/// passes without constraint.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Value::Object(schema) = schema else { return Ok(()) };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let Value::Object(args) = arguments else {
            return Err("arguments must be an object".to_string());
        };
        for name in required {
            let Some(name) = name.as_str() else { continue };
            if !args.contains_key(name) {
                return Err(format!("missing required argument '{name}'"));
            }
        }
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        let Value::Object(args) = arguments else { return Ok(()) };
        for (name, prop_schema) in properties {
            let Some(value) = args.get(name) else { continue };
            validate_value(name, prop_schema, value)?;
        }
    }

    Ok(())
}

fn validate_value(name: &str, prop_schema: &Value, value: &Value) -> Result<(), String> {
    let Value::Object(prop_schema) = prop_schema else { return Ok(()) };

    if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(format!("argument '{name}' is not one of the allowed enum values"));
        }
    }

    if let Some(ty) = prop_schema.get("type").and_then(Value::as_str) {
        let matches = match ty {
            "string" => value.is_string(),
            "boolean" => value.is_boolean(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            "null" => value.is_null(),
            _ => true,
        };
        if !matches {
            return Err(format!("argument '{name}' does not match expected type '{ty}'"));
        }
    }

    Ok(())
}
