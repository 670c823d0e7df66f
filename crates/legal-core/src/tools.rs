// Tool abstraction and the registry that is the single source of truth for
// every callable tool the model may invoke (C1).
//
// Design decisions:
// - Tools are defined via a trait for flexibility (function-style tools).
// - ToolRegistry both holds declarations and dispatches calls; validation
//   happens before a handler ever runs.
// - Internal errors are logged in full but replaced with a generic message
//   before being shown to the model (security: no leaking connection
//   strings, stack traces, or provider error bodies).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

use crate::logging::ThinkingLogger;
use crate::tool_types::{ToolCall, ToolDeclaration, ToolResult};

const HANDLER_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-turn context handed to every tool handler. `logger` gives the
/// `log_thought` tool (and nothing else) a direct path to C9 without
/// threading a separate channel through every tool signature.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: Uuid,
    pub turn_id: Uuid,
    pub active_contract_id: Option<Uuid>,
    pub logger: Arc<ThinkingLogger>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("turn_id", &self.turn_id)
            .field("active_contract_id", &self.active_contract_id)
            .finish()
    }
}

/// Outcome of executing one tool's handler, before dispatch-level concerns
/// (schema validation, timeout) are applied.
#[derive(Debug)]
pub enum ToolOutcome {
    /// Handler succeeded; the value is sent back to the model verbatim.
    Success(Value),
    /// Expected, user/model-recoverable failure: "no clauses found", "unknown
    /// regulation". Safe to show to the model.
    ToolError(String),
    /// Unexpected failure (DB down, upstream 500). Logged in full; the model
    /// only ever sees a generic message.
    InternalError(String),
}

impl ToolOutcome {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success(value.into())
    }

    pub fn tool_error(message: impl Into<String>) -> Self {
        Self::ToolError(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

/// A callable tool. Implementations are registered with a [`ToolRegistry`]
/// under `name()` and exposed to the model as a [`ToolDeclaration`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON-schema-like object: `{"type": "object", "properties": {...},
    /// "required": [...]}`. Validated against the raw arguments before the
    /// handler runs.
    fn parameter_schema(&self) -> Value;
    /// Whether this tool has side effects outside the Store read path
    /// (writes, document generation). Informational; dispatch treats all
    /// tools identically.
    fn side_effecting(&self) -> bool {
        false
    }
    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolOutcome;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameter_schema: self.parameter_schema(),
        }
    }
}

/// Result of [`ToolRegistry::dispatch`] in the `{ok, value}` /
/// `{ok=false, kind, message}` shape from the specification.
#[derive(Debug)]
pub enum DispatchOutcome {
    Ok(Value),
    Failed { kind: &'static str, message: String },
}

impl DispatchOutcome {
    pub fn into_tool_result(self, tool_call_id: &str) -> ToolResult {
        match self {
            Self::Ok(value) => ToolResult::success(tool_call_id, value),
            Self::Failed { kind, message } => ToolResult::failure(tool_call_id, kind, message),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Validates `args` against a minimal JSON-schema subset: object type,
/// `required` field presence. Returns the names of missing required fields.
fn missing_required_fields(schema: &Value, args: &Value) -> Vec<String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Vec::new();
    };
    let obj = args.as_object();
    required
        .iter()
        .filter_map(Value::as_str)
        .filter(|field| obj.map(|o| !o.contains_key(*field)).unwrap_or(true))
        .map(str::to_string)
        .collect()
}

/// Holds every tool the model may invoke for a given registry instance.
/// Agents see a filtered subset, assembled by the AgentCatalog at startup;
/// the registry itself is immutable after construction.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The list of `{name, description, parameter_schema}` passed verbatim
    /// to the ModelClient as the tool menu, restricted to `names`.
    pub fn declarations(&self, names: &[String]) -> Vec<ToolDeclaration> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.declaration())
            .collect()
    }

    /// Validates `raw_args` against the tool's schema and, on success,
    /// invokes the handler with a 20s timeout. Never raises — every failure
    /// path returns a [`DispatchOutcome::Failed`] so the model can recover.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> DispatchOutcome {
        let Some(tool) = self.tools.get(&call.name) else {
            return DispatchOutcome::Failed {
                kind: "unknown_tool",
                message: format!("no such tool: {}", call.name),
            };
        };

        let missing = missing_required_fields(&tool.parameter_schema(), &call.arguments);
        if !missing.is_empty() {
            return DispatchOutcome::Failed {
                kind: "bad_arguments",
                message: format!("missing required field(s): {}", missing.join(", ")),
            };
        }

        let outcome = tokio::time::timeout(HANDLER_TIMEOUT, tool.call(call.arguments.clone(), ctx)).await;

        match outcome {
            Err(_) => DispatchOutcome::Failed {
                kind: "handler_timeout",
                message: format!("tool '{}' did not complete within {}s", call.name, HANDLER_TIMEOUT.as_secs()),
            },
            Ok(ToolOutcome::Success(value)) => DispatchOutcome::Ok(value),
            Ok(ToolOutcome::ToolError(message)) => DispatchOutcome::Failed {
                kind: "handler_error",
                message,
            },
            Ok(ToolOutcome::InternalError(detail)) => {
                error!(tool = %call.name, call_id = %call.id, error = %detail, "tool internal error (hidden from model)");
                DispatchOutcome::Failed {
                    kind: "handler_error",
                    message: "an internal error occurred while executing this tool".to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameter_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }
        async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
            ToolOutcome::success(arguments)
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn description(&self) -> &str {
            "always fails internally"
        }
        fn parameter_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn call(&self, _arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
            ToolOutcome::internal_error("connection refused: db:5432")
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: Uuid::now_v7(),
            turn_id: Uuid::now_v7(),
            active_contract_id: None,
            logger: Arc::new(ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7())),
        }
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_returns_unknown_tool_kind() {
        let registry = ToolRegistry::new();
        let call = ToolCall { id: "1".into(), name: "nope".into(), arguments: serde_json::json!({}) };
        let outcome = registry.dispatch(&call, &ctx()).await;
        assert!(matches!(outcome, DispatchOutcome::Failed { kind: "unknown_tool", .. }));
    }

    #[tokio::test]
    async fn dispatch_missing_required_field_never_calls_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        let call = ToolCall { id: "1".into(), name: "echo".into(), arguments: serde_json::json!({}) };
        let outcome = registry.dispatch(&call, &ctx()).await;
        assert!(matches!(outcome, DispatchOutcome::Failed { kind: "bad_arguments", .. }));
    }

    #[tokio::test]
    async fn dispatch_success_round_trips_the_value() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        let call = ToolCall { id: "1".into(), name: "echo".into(), arguments: serde_json::json!({"text": "hi"}) };
        let outcome = registry.dispatch(&call, &ctx()).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn internal_error_is_hidden_from_the_model() {
        let mut registry = ToolRegistry::new();
        registry.register(AlwaysFails);
        let call = ToolCall { id: "1".into(), name: "always_fails".into(), arguments: serde_json::json!({}) };
        let outcome = registry.dispatch(&call, &ctx()).await;
        match outcome {
            DispatchOutcome::Failed { kind, message } => {
                assert_eq!(kind, "handler_error");
                assert!(!message.contains("db:5432"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn declarations_filters_to_the_requested_subset() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        registry.register(AlwaysFails);
        let decls = registry.declarations(&["echo".to_string()]);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "echo");
    }
}
