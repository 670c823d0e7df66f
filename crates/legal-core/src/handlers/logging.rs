use async_trait::async_trait;
use serde_json::{json, Value};

use crate::entities::ThinkingStage;
use crate::tools::{Tool, ToolContext, ToolOutcome};

/// Gives an agent a direct path to C9 for its own internal reasoning notes,
/// independent of the `tool_call`/`tool_result` pair AgentRunner already logs
/// around every dispatch.
pub struct LogThought;

#[async_trait]
impl Tool for LogThought {
    fn name(&self) -> &str {
        "log_thought"
    }

    fn description(&self) -> &str {
        "Record an internal reasoning note for this turn's trace."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_name": {"type": "string"},
                "stage": {"type": "string"},
                "payload": {}
            },
            "required": ["agent_name", "stage", "payload"]
        })
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolOutcome {
        let Some(agent_name) = arguments.get("agent_name").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("agent_name must be a string");
        };
        let Some(stage_str) = arguments.get("stage").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("stage must be a string");
        };
        let stage: ThinkingStage = match serde_json::from_value(json!(stage_str)) {
            Ok(stage) => stage,
            Err(_) => {
                return ToolOutcome::tool_error(
                    "stage must be one of classify, agent_start, tool_call, tool_result, agent_output, error",
                )
            }
        };
        let payload = arguments.get("payload").cloned().unwrap_or(Value::Null);

        ctx.logger.record(agent_name, stage, payload).await;
        ToolOutcome::success(json!({"logged": true}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::ThinkingLogger;
    use std::sync::Arc;
    use uuid::Uuid;

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: Uuid::now_v7(),
            turn_id: Uuid::now_v7(),
            active_contract_id: None,
            logger: Arc::new(ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7())),
        }
    }

    #[tokio::test]
    async fn records_a_custom_stage_against_the_turn_logger() {
        let tool = LogThought;
        let context = ctx();
        let outcome = tool
            .call(json!({"agent_name": "RISK_ASSESSOR", "stage": "agent_output", "payload": {"note": "done"}}), &context)
            .await;
        assert!(matches!(outcome, ToolOutcome::Success(_)));
        assert_eq!(context.logger.len().await, 1);
    }

    #[tokio::test]
    async fn rejects_an_unknown_stage() {
        let tool = LogThought;
        let outcome = tool.call(json!({"agent_name": "X", "stage": "not_a_stage", "payload": {}}), &ctx()).await;
        assert!(matches!(outcome, ToolOutcome::ToolError(_)));
    }
}
