// AgentRunner (C7): the bounded tool-calling loop run for a single agent's
// turn. State machine: init -> awaiting_model -> dispatching ->
// awaiting_model -> ... -> complete | failed.
//
// Two hard bounds apply: `max_tool_iterations` (a ToolLoopExceeded error
// past the limit) and a wall-clock timeout over the whole turn (AgentTimeout).
// Both are recoverable at the SessionOrchestrator level — they fail one
// agent in a pipeline, not the whole request.

use std::time::Duration;

use serde_json::json;

use crate::catalog::AgentDefinition;
use crate::entities::{Citation, ThinkingStage, ToolCallSummary};
use crate::error::{OrchestratorError, Result};
use crate::logging::ThinkingLogger;
use crate::tools::{ToolContext, ToolRegistry};
use crate::traits::{ModelClient, ModelMessage, ModelTurnState};

pub struct AgentTurnOutcome {
    pub content: String,
    pub citations: Vec<Citation>,
    pub tool_calls_summary: Vec<ToolCallSummary>,
}

pub struct AgentRunner;

impl AgentRunner {
    /// Runs one agent's bounded tool-calling loop to completion. `messages`
    /// is the already-assembled context (system block applied separately via
    /// `system`); the agent's own system instructions and the call-site
    /// context window are the caller's responsibility (see `ContextBuilder`).
    pub async fn run(
        agent: &AgentDefinition,
        model: &dyn ModelClient,
        tools: &ToolRegistry,
        tool_ctx: &ToolContext,
        logger: &ThinkingLogger,
        system: &str,
        messages: Vec<ModelMessage>,
        agent_turn_timeout: Duration,
    ) -> Result<AgentTurnOutcome> {
        tokio::time::timeout(
            agent_turn_timeout,
            Self::run_unbounded(agent, model, tools, tool_ctx, logger, system, messages),
        )
        .await
        .map_err(|_| OrchestratorError::AgentTimeout(agent_turn_timeout.as_secs()))?
    }

    async fn run_unbounded(
        agent: &AgentDefinition,
        model: &dyn ModelClient,
        tools: &ToolRegistry,
        tool_ctx: &ToolContext,
        logger: &ThinkingLogger,
        system: &str,
        mut messages: Vec<ModelMessage>,
    ) -> Result<AgentTurnOutcome> {
        let declarations = tools.declarations(&agent.tool_names);

        logger
            .record(agent.name.as_str(), ThinkingStage::AgentStart, json!({"purpose": agent.purpose}))
            .await;

        let mut response = model.generate(system, &messages, &declarations, &agent.default_options).await?;

        let mut all_summaries = Vec::new();
        let mut round = 0usize;

        while response.has_tool_requests() {
            round += 1;
            if round > agent.max_tool_iterations {
                return Err(OrchestratorError::ToolLoopExceeded(agent.max_tool_iterations));
            }

            let mut results = Vec::with_capacity(response.tool_requests.len());
            for call in &response.tool_requests {
                logger
                    .record(
                        agent.name.as_str(),
                        ThinkingStage::ToolCall,
                        json!({"tool": call.name, "arguments": call.arguments}),
                    )
                    .await;

                let outcome = tools.dispatch(call, tool_ctx).await;
                let succeeded = outcome.is_ok();

                logger
                    .record(agent.name.as_str(), ThinkingStage::ToolResult, json!({"tool": call.name, "ok": succeeded}))
                    .await;

                all_summaries.push(ToolCallSummary { name: call.name.clone(), succeeded });
                results.push(outcome.into_tool_result(&call.id));
            }

            messages.push(ModelMessage::assistant_with_tools(response.text(), response.tool_requests.clone()));

            let state = ModelTurnState {
                system: system.to_string(),
                messages: messages.clone(),
                tools: declarations.clone(),
                options: agent.default_options.clone(),
            };
            response = model.continue_with_tool_results(&state, &results).await?;

            for result in &results {
                messages.push(ModelMessage::tool_result(result));
            }
        }

        logger
            .record(agent.name.as_str(), ThinkingStage::AgentOutput, json!({"tool_rounds": round}))
            .await;

        Ok(AgentTurnOutcome {
            content: response.text(),
            citations: response.citations,
            tool_calls_summary: all_summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AgentCatalog;
    use crate::memory::{InMemoryModelClient, ScriptedResponse};
    use uuid::Uuid;

    fn tool_ctx() -> ToolContext {
        ToolContext {
            session_id: Uuid::now_v7(),
            turn_id: Uuid::now_v7(),
            active_contract_id: None,
            logger: std::sync::Arc::new(ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7())),
        }
    }

    #[tokio::test]
    async fn zero_tool_calls_terminates_in_one_model_call() {
        let catalog = AgentCatalog::with_builtins(6);
        let agent = catalog.get(crate::catalog::AgentName::Assistant);
        let model = InMemoryModelClient::always(ScriptedResponse::text("hello there"));
        let registry = ToolRegistry::new();
        let logger = ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7());

        let outcome = AgentRunner::run(
            agent,
            &model,
            &registry,
            &tool_ctx(),
            &logger,
            "system",
            vec![ModelMessage::user("hi")],
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(outcome.content, "hello there");
        assert!(outcome.tool_calls_summary.is_empty());
    }

    #[tokio::test]
    async fn exceeding_max_tool_iterations_fails_with_tool_loop_exceeded() {
        let mut agent = AgentCatalog::with_builtins(2).get(crate::catalog::AgentName::ContractParser).clone();
        agent.max_tool_iterations = 2;
        let model = InMemoryModelClient::new(vec![ScriptedResponse::tool_call(
            "get_contract_by_id",
            serde_json::json!({"contract_id": "c1"}),
        )]);

        struct AlwaysOk;
        #[async_trait::async_trait]
        impl crate::tools::Tool for AlwaysOk {
            fn name(&self) -> &str {
                "get_contract_by_id"
            }
            fn description(&self) -> &str {
                "fetch a contract"
            }
            fn parameter_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object", "properties": {"contract_id": {"type": "string"}}, "required": ["contract_id"]})
            }
            async fn call(&self, _arguments: serde_json::Value, _ctx: &ToolContext) -> crate::tools::ToolOutcome {
                crate::tools::ToolOutcome::success(serde_json::json!({"id": "c1"}))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(AlwaysOk);
        let logger = ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7());

        let result = AgentRunner::run(
            &agent,
            &model,
            &registry,
            &tool_ctx(),
            &logger,
            "system",
            vec![ModelMessage::user("parse it")],
            Duration::from_secs(30),
        )
        .await;

        assert!(matches!(result, Err(OrchestratorError::ToolLoopExceeded(2))));
    }

    /// S5 — tool handler timeout. The handler sleeps past the registry's
    /// 20s dispatch timeout; dispatch fails with `handler_timeout` instead
    /// of hanging the turn, the model is told, and the agent turn still
    /// completes successfully once the model adapts.
    struct SleepyComplianceCheck;

    #[async_trait::async_trait]
    impl crate::tools::Tool for SleepyComplianceCheck {
        fn name(&self) -> &str {
            "check_compliance"
        }
        fn description(&self) -> &str {
            "a compliance check that never finishes in time"
        }
        fn parameter_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"regulation": {"type": "string"}, "contract_id": {"type": "string"}},
                "required": ["regulation", "contract_id"]
            })
        }
        async fn call(&self, _arguments: serde_json::Value, _ctx: &ToolContext) -> crate::tools::ToolOutcome {
            tokio::time::sleep(Duration::from_secs(25)).await;
            crate::tools::ToolOutcome::success(serde_json::json!({"ok": true}))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exceeding_the_handler_timeout_lets_the_model_adapt_and_finish() {
        let agent = AgentCatalog::with_builtins(6).get(crate::catalog::AgentName::ComplianceChecker).clone();
        let model = InMemoryModelClient::new(vec![
            ScriptedResponse::tool_call(
                "check_compliance",
                serde_json::json!({"regulation": "GDPR", "contract_id": uuid::Uuid::now_v7().to_string()}),
            ),
            ScriptedResponse::text("I couldn't complete the compliance check in time for this subtask."),
        ]);

        let mut registry = ToolRegistry::new();
        registry.register(SleepyComplianceCheck);
        let logger = ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7());

        let outcome = AgentRunner::run(
            &agent,
            &model,
            &registry,
            &tool_ctx(),
            &logger,
            "system",
            vec![ModelMessage::user("is this GDPR compliant?")],
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert!(outcome.content.contains("couldn't complete"));
        assert_eq!(outcome.tool_calls_summary.len(), 1);
        assert!(!outcome.tool_calls_summary[0].succeeded, "the timed-out tool call must be marked failed");
    }
}
