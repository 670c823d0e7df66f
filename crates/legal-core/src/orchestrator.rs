// SessionOrchestrator (C8): drives one chat turn end to end — resolve the
// session, classify, run the agent pipeline sequentially, merge citations,
// persist, and return the wire-shaped response. Never propagates an error
// to its caller: every failure path is caught and turned into a structured
// `ChatResponse` with `success = false`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::{AgentCatalog, AgentName};
use crate::classifier::{ClassifierSnapshot, QueryClassifier};
use crate::context::ContextBuilder;
use crate::entities::{Citation, Message, Session, ThinkingStage};
use crate::error::{OrchestratorError, Result};
use crate::executor::AgentRunner;
use crate::logging::ThinkingLogger;
use crate::tools::{ToolContext, ToolRegistry};
use crate::traits::{ModelClient, Store};

const MAX_MESSAGE_CHARS: usize = 8_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    pub agent: String,
    pub agent_id: String,
    pub citations: Vec<Citation>,
    pub tools_used: Vec<String>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatRequest {
    pub session_id: Option<Uuid>,
    pub contract_id: Option<Uuid>,
    pub message: String,
}

pub struct SessionOrchestrator {
    store: Arc<dyn Store>,
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    catalog: Arc<AgentCatalog>,
    context_builder: ContextBuilder,
    agent_turn_timeout: std::time::Duration,
    request_timeout: std::time::Duration,
    use_grounded_backend: bool,
    session_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        catalog: Arc<AgentCatalog>,
        history_window_pairs: usize,
        agent_turn_timeout: std::time::Duration,
        request_timeout: std::time::Duration,
        use_grounded_backend: bool,
    ) -> Self {
        Self {
            store,
            model,
            tools,
            catalog,
            context_builder: ContextBuilder::new(history_window_pairs),
            agent_turn_timeout,
            request_timeout,
            use_grounded_backend,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for_session(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks.entry(session_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn handle_chat(&self, request: ChatRequest) -> ChatResponse {
        if request.message.trim().is_empty() || request.message.len() > MAX_MESSAGE_CHARS {
            let error = OrchestratorError::invalid_request(format!(
                "message must be non-empty and at most {MAX_MESSAGE_CHARS} characters"
            ));
            return ChatResponse {
                success: false,
                message: error.user_message(),
                agent: String::new(),
                agent_id: String::new(),
                citations: Vec::new(),
                tools_used: Vec::new(),
                session_id: request.session_id.map(|s| s.to_string()).unwrap_or_default(),
                error: Some(error.kind().to_string()),
            };
        }

        match self.run_turn(request).await {
            Ok(response) => response,
            Err((session_id, err)) => ChatResponse {
                success: false,
                message: err.user_message(),
                agent: String::new(),
                agent_id: String::new(),
                citations: Vec::new(),
                tools_used: Vec::new(),
                session_id: session_id.to_string(),
                error: Some(err.kind().to_string()),
            },
        }
    }

    async fn run_turn(&self, request: ChatRequest) -> std::result::Result<ChatResponse, (Uuid, OrchestratorError)> {
        let fallback_session_id = request.session_id.unwrap_or_else(Uuid::nil);
        let session = self
            .resolve_session(request.session_id)
            .await
            .map_err(|e| (fallback_session_id, e))?;
        let session_lock = self.lock_for_session(session.id).await;
        let _guard = session_lock.lock().await;

        let turn_id = Uuid::now_v7();
        let logger = Arc::new(ThinkingLogger::new(session.id, turn_id));

        // Whole-request hard ceiling (spec §5): wraps classification, the
        // full agent pipeline, and persistence. A per-agent timeout (30s,
        // see executor.rs) degrades gracefully and keeps the turn going; this
        // outer one can't — there's no partial output left to fall back to.
        let result = match tokio::time::timeout(
            self.request_timeout,
            self.run_turn_locked(&session, request, turn_id, &logger),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                logger
                    .record("ORCHESTRATOR", ThinkingStage::Error, json!({"error": "request_timeout"}))
                    .await;
                Err(OrchestratorError::RequestTimeout(self.request_timeout.as_secs()))
            }
        };

        // ThinkingLogs are advisory: a flush failure never fails the turn.
        let _ = logger.flush(&self.store).await;

        result.map_err(|e| (session.id, e))
    }

    async fn resolve_session(&self, session_id: Option<Uuid>) -> Result<Session> {
        match session_id {
            Some(id) => match self.store.get_session(id).await? {
                Some(session) => Ok(session),
                None => Err(OrchestratorError::invalid_request("unknown session_id")),
            },
            None => self.store.create_session(Session::new()).await,
        }
    }

    async fn run_turn_locked(
        &self,
        session: &Session,
        request: ChatRequest,
        turn_id: Uuid,
        logger: &Arc<ThinkingLogger>,
    ) -> Result<ChatResponse> {
        if let Some(contract_id) = request.contract_id {
            self.store.set_active_contract(session.id, Some(contract_id)).await?;
        }
        let active_contract_id = request.contract_id.or(session.active_contract_id);

        self.store.create_message(Message::user(session.id, request.message.clone())).await?;

        let history = self.store.list_messages(session.id, 50, None).await?;
        let clauses_exist = match active_contract_id {
            Some(contract_id) => !self.store.list_clauses(contract_id).await?.is_empty(),
            None => false,
        };
        let snapshot = ClassifierSnapshot {
            active_contract_present: active_contract_id.is_some(),
            conversation_length: history.len(),
            clauses_exist_for_active_contract: clauses_exist,
        };
        let classification = match QueryClassifier::classify_rule_based(&request.message, &snapshot) {
            Some(c) => c,
            None => QueryClassifier::classify_with_model(&request.message, self.model.as_ref()).await?,
        };

        logger
            .record(
                "ORCHESTRATOR",
                ThinkingStage::Classify,
                json!({"query_type": classification.query_type, "pipeline": classification.pipeline.iter().map(|a| a.as_str()).collect::<Vec<_>>()}),
            )
            .await;

        let tool_ctx = ToolContext { session_id: session.id, turn_id, active_contract_id, logger: logger.clone() };
        let contract_digest = match active_contract_id {
            Some(contract_id) => match self.store.get_contract(contract_id).await? {
                Some(contract) => {
                    let clauses = self.store.list_clauses(contract_id).await?;
                    Some(self.context_builder.contract_digest(&contract, &clauses))
                }
                None => None,
            },
            None => None,
        };

        let pipeline_len = classification.pipeline.len();
        let mut last_content = String::new();
        let mut last_agent = AgentName::Assistant;
        let mut synthesizer_content: Option<(AgentName, String)> = None;
        let mut all_citations: Vec<Citation> = Vec::new();
        let mut all_tools_used: Vec<String> = Vec::new();
        let mut all_tool_summaries: Vec<crate::entities::ToolCallSummary> = Vec::new();
        let synthesizer = self.catalog.designated_synthesizer();

        // Running context buffer (spec.md:158): each agent's output is
        // appended here so later agents in the same pipeline can see earlier
        // findings even when they have no tool access in common — e.g.
        // LEGAL_MEMO (DOCUMENT_TOOLS + LOGGING_TOOLS only) reading
        // COMPLIANCE_CHECKER's and RISK_ASSESSOR's content.
        let mut running_context: Vec<(String, String)> = Vec::new();

        for (step, agent_name) in classification.pipeline.iter().enumerate() {
            let agent = self.catalog.get(*agent_name);
            let system = self.context_builder.system_block(agent);
            let messages =
                self.context_builder.build(&history, contract_digest.clone(), &running_context, &request.message);

            let outcome = AgentRunner::run(
                agent,
                self.model.as_ref(),
                &self.tools,
                &tool_ctx,
                logger,
                &system,
                messages,
                self.agent_turn_timeout,
            )
            .await;

            match outcome {
                Ok(turn) => {
                    last_content = turn.content.clone();
                    last_agent = *agent_name;
                    if *agent_name == synthesizer {
                        synthesizer_content = Some((*agent_name, turn.content.clone()));
                    }
                    for citation in &turn.citations {
                        if !all_citations.iter().any(|c: &Citation| c.uri == citation.uri) {
                            all_citations.push(citation.clone());
                        }
                    }
                    for summary in turn.tool_calls_summary {
                        all_tools_used.push(summary.name.clone());
                        all_tool_summaries.push(summary);
                    }
                    running_context.push((agent_name.as_str().to_string(), turn.content));
                }
                Err(mut err) => {
                    // spec.md:196 — a grounded agent failing upstream while the
                    // grounded backend is required is a configuration error, not
                    // a recoverable/degradable one: no silent fallback.
                    if self.use_grounded_backend
                        && agent.grounded_search
                        && matches!(err, OrchestratorError::UpstreamUnavailable(_))
                    {
                        err = OrchestratorError::Configuration(format!(
                            "grounded backend call failed for {}: {err}",
                            agent_name.as_str()
                        ));
                    }

                    logger
                        .record(agent_name.as_str(), ThinkingStage::Error, json!({"error": err.kind()}))
                        .await;

                    if matches!(err, OrchestratorError::Configuration(_)) {
                        return Err(err);
                    }

                    // AgentTimeout and ToolLoopExceeded are recoverable at this level (see
                    // executor.rs): the agent degrades to its friendly message instead of
                    // aborting the request, even when it's the only or final agent.
                    let recoverable =
                        matches!(err, OrchestratorError::AgentTimeout(_) | OrchestratorError::ToolLoopExceeded(_));
                    if recoverable {
                        last_content = err.user_message();
                        last_agent = *agent_name;
                        continue;
                    }

                    let is_only_agent = pipeline_len == 1;
                    let is_prerequisite = step + 1 < pipeline_len;
                    if is_only_agent || is_prerequisite {
                        return Err(OrchestratorError::PipelineAborted(err.user_message()));
                    }
                    // Non-prerequisite, non-final failure: skip and continue.
                }
            }
        }

        let (final_agent, final_content) = synthesizer_content.unwrap_or((last_agent, last_content));

        let mut assistant_message = Message::assistant(session.id, final_agent.as_str(), final_content.clone());
        assistant_message.citations = all_citations.clone();
        assistant_message.tool_calls_summary = all_tool_summaries;
        self.store.create_message(assistant_message).await?;

        Ok(ChatResponse {
            success: true,
            message: final_content,
            agent: final_agent.as_str().to_string(),
            agent_id: final_agent.as_str().to_string(),
            citations: all_citations,
            tools_used: all_tools_used,
            session_id: session.id.to_string(),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ComplianceRule, Contract, ContractStatus, Party, RuleSeverity};
    use crate::handlers::register_builtins;
    use crate::memory::{InMemoryBlobStore, InMemoryModelClient, InMemoryStore, ScriptedResponse};
    use crate::tool_types::ToolDeclaration;
    use crate::traits::{BlobStore, GenerateOptions, ModelMessage, ModelResponse, ModelUsage};

    fn orchestrator(model: InMemoryModelClient) -> SessionOrchestrator {
        SessionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(model),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        )
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_touching_the_model() {
        let orchestrator = orchestrator(InMemoryModelClient::always(ScriptedResponse::text("unused")));
        let response = orchestrator
            .handle_chat(ChatRequest { session_id: None, contract_id: None, message: "   ".to_string() })
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("invalid_request"));
    }

    #[tokio::test]
    async fn greeting_round_trips_to_a_successful_response() {
        let orchestrator = orchestrator(InMemoryModelClient::always(ScriptedResponse::text("Hi! How can I help?")));
        let response = orchestrator
            .handle_chat(ChatRequest { session_id: None, contract_id: None, message: "hello".to_string() })
            .await;
        assert!(response.success);
        assert_eq!(response.agent, "ASSISTANT");
        assert_eq!(response.message, "Hi! How can I help?");
        assert!(!response.session_id.is_empty());
    }

    #[tokio::test]
    async fn unknown_session_id_is_an_invalid_request() {
        let orchestrator = orchestrator(InMemoryModelClient::always(ScriptedResponse::text("unused")));
        let response = orchestrator
            .handle_chat(ChatRequest { session_id: Some(Uuid::now_v7()), contract_id: None, message: "hello".to_string() })
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("invalid_request"));
    }

    /// S2 — party listing on an uploaded contract. The contract digest must
    /// surface normalized party names ("Parties: Acme, Globex"), never a
    /// stringified record.
    struct DigestCapturingModel;

    #[async_trait::async_trait]
    impl ModelClient for DigestCapturingModel {
        async fn generate(
            &self,
            _system: &str,
            messages: &[ModelMessage],
            _tools: &[ToolDeclaration],
            _options: &GenerateOptions,
        ) -> Result<ModelResponse> {
            let joined = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
            assert!(joined.contains("Parties: Acme, Globex"), "digest missing from prompt: {joined}");
            Ok(ModelResponse {
                content_parts: vec!["The parties are Acme and Globex.".to_string()],
                tool_requests: Vec::new(),
                citations: Vec::new(),
                finish_reason: "stop".to_string(),
                usage: ModelUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn s2_party_listing_reads_normalized_names_from_the_digest() {
        let store = Arc::new(InMemoryStore::new());
        let contract = Contract {
            id: Uuid::now_v7(),
            title: "Master Services Agreement".into(),
            contract_type: Some("MSA".into()),
            parties: vec![
                Party { name: "Acme".into(), role: Some("vendor".into()) },
                Party { name: "Globex".into(), role: Some("client".into()) },
            ],
            uploaded_at: chrono::Utc::now(),
            file_uri: "memory://c1".into(),
            status: ContractStatus::Ready,
            overall_risk_score: None,
            compliance_status: crate::entities::ComplianceStatus::Unknown,
        };
        store.save_contract(contract.clone()).await.unwrap();
        store.save_clauses(contract.id, vec![crate::entities::Clause {
            id: Uuid::now_v7(),
            contract_id: contract.id,
            index: 0,
            clause_type: "general".into(),
            text: "This agreement is between the parties.".into(),
            risk_score: Some(0.1),
            notes: None,
        }]).await.unwrap();

        let orchestrator = SessionOrchestrator::new(
            store,
            Arc::new(DigestCapturingModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: Some(contract.id),
                message: "What is the risk here?".to_string(),
            })
            .await;

        assert!(response.success, "error: {:?}", response.error);
        assert!(response.message.contains("Acme") && response.message.contains("Globex"));
        assert!(response.error.is_none());
    }

    /// S3 — GDPR compliance check against a contract with no clauses yet.
    /// The classifier must prepend CONTRACT_PARSER, and by the end of the
    /// turn clauses exist in the Store for the contract.
    #[tokio::test]
    async fn s3_gdpr_compliance_check_parses_then_checks() {
        let store = Arc::new(InMemoryStore::with_compliance_rules(vec![ComplianceRule {
            regulation: "GDPR".into(),
            rule_id: "GDPR-1".into(),
            text: "Personal data must be processed lawfully.".into(),
            category: "data_processing".into(),
            severity: RuleSeverity::High,
        }]));
        let blobs = Arc::new(InMemoryBlobStore::new());

        let contract_id = Uuid::now_v7();
        let file_uri = blobs
            .put(&format!("contracts/{contract_id}/doc.txt"), b"Data processing terms.\n\nGoverning law clause.".to_vec(), "text/plain")
            .await
            .unwrap();
        store
            .save_contract(Contract {
                id: contract_id,
                title: "Data Processing Agreement".into(),
                contract_type: Some("DPA".into()),
                parties: vec![],
                uploaded_at: chrono::Utc::now(),
                file_uri,
                status: ContractStatus::Uploaded,
                overall_risk_score: None,
                compliance_status: crate::entities::ComplianceStatus::Unknown,
            })
            .await
            .unwrap();

        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, store.clone() as Arc<dyn Store>, blobs.clone());

        let model = InMemoryModelClient::new(vec![
            // CONTRACT_PARSER turn: extract, then save, then a final note.
            ScriptedResponse::tool_call("extract_clauses", json!({"contract_id": contract_id})),
            ScriptedResponse::tool_call(
                "save_clauses",
                json!({"contract_id": contract_id, "clauses": [{
                    "id": Uuid::now_v7(), "contract_id": contract_id, "index": 0,
                    "type": "governing_law", "text": "Governing law clause.",
                }]}),
            ),
            ScriptedResponse::text("Clauses parsed and saved."),
            // COMPLIANCE_CHECKER turn: fetch rules, check, then report.
            ScriptedResponse::tool_call("get_compliance_rules", json!({"regulation": "GDPR"})),
            ScriptedResponse::tool_call("check_compliance", json!({"regulation": "GDPR", "contract_id": contract_id})),
            ScriptedResponse::text("GDPR verdict: 1 of 1 rules addressed."),
        ]);

        let orchestrator = SessionOrchestrator::new(
            store.clone(),
            Arc::new(model),
            Arc::new(registry),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: Some(contract_id),
                message: "Is this GDPR compliant?".to_string(),
            })
            .await;

        assert!(response.success, "error: {:?}", response.error);
        assert_eq!(response.agent, "COMPLIANCE_CHECKER");
        assert!(response.message.contains("GDPR"));

        let clauses = store.list_clauses(contract_id).await.unwrap();
        assert!(!clauses.is_empty(), "clauses should now exist in the Store for the contract");
    }

    /// S4 — legal research with citations. No active contract, grounded
    /// search is requested, and the response carries non-empty citations.
    struct GroundedResearchModel;

    #[async_trait::async_trait]
    impl ModelClient for GroundedResearchModel {
        async fn generate(
            &self,
            _system: &str,
            _messages: &[ModelMessage],
            _tools: &[ToolDeclaration],
            options: &GenerateOptions,
        ) -> Result<ModelResponse> {
            assert!(options.grounded_search, "legal research must request grounded search");
            Ok(ModelResponse {
                content_parts: vec!["A force majeure clause excuses performance after an unforeseeable event.".to_string()],
                tool_requests: Vec::new(),
                citations: vec![crate::entities::Citation {
                    title: "Restatement (Second) of Contracts".into(),
                    uri: "https://example.com/restatement".into(),
                    start: None,
                    end: None,
                }],
                finish_reason: "stop".to_string(),
                usage: ModelUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn s4_legal_research_returns_non_empty_citations() {
        let orchestrator = SessionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(GroundedResearchModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: None,
                message: "What is a force majeure clause?".to_string(),
            })
            .await;

        assert!(response.success, "error: {:?}", response.error);
        assert_eq!(response.agent, "LEGAL_RESEARCH");
        assert!(!response.citations.is_empty());
        assert!(response.citations.iter().all(|c| !c.uri.is_empty()));
        assert!(response.tools_used.is_empty());
    }

    /// spec.md:196 — when the grounded backend is required and a grounded
    /// agent's upstream call fails, the whole request fails with
    /// `configuration_error`; it is not degraded or silently retried
    /// ungrounded.
    struct UpstreamFailingModel;

    #[async_trait::async_trait]
    impl ModelClient for UpstreamFailingModel {
        async fn generate(
            &self,
            _system: &str,
            _messages: &[ModelMessage],
            _tools: &[ToolDeclaration],
            options: &GenerateOptions,
        ) -> Result<ModelResponse> {
            assert!(options.grounded_search, "legal research must request grounded search");
            Err(OrchestratorError::upstream_unavailable("grounded search backend returned 503"))
        }
    }

    #[tokio::test]
    async fn grounded_backend_failure_is_a_configuration_error_with_no_fallback() {
        let orchestrator = SessionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(UpstreamFailingModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            true,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: None,
                message: "What is a force majeure clause?".to_string(),
            })
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("configuration_error"));
    }

    #[tokio::test]
    async fn grounded_backend_failure_is_not_a_configuration_error_when_not_required() {
        // Same upstream failure, but `use_grounded_backend` is off: no
        // special-casing applies, the error surfaces under its own kind.
        let orchestrator = SessionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(UpstreamFailingModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: None,
                message: "What is a force majeure clause?".to_string(),
            })
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("pipeline_aborted"));
    }

    /// spec.md:158 — LEGAL_MEMO has no tool access to compliance/risk
    /// findings (catalog.rs: DOCUMENT_TOOLS + LOGGING_TOOLS only), so it can
    /// only see them through the running context buffer.
    struct MemoReadsRunningContextModel;

    #[async_trait::async_trait]
    impl ModelClient for MemoReadsRunningContextModel {
        async fn generate(
            &self,
            _system: &str,
            messages: &[ModelMessage],
            _tools: &[ToolDeclaration],
            _options: &GenerateOptions,
        ) -> Result<ModelResponse> {
            let joined = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
            let content = if joined.contains("COMPLIANCE_CHECKER findings this turn") && joined.contains("RISK_ASSESSOR findings this turn")
            {
                "Memo: compliance and risk findings incorporated."
            } else {
                "Memo: missing prior findings."
            };
            Ok(ModelResponse {
                content_parts: vec![content.to_string()],
                tool_requests: Vec::new(),
                citations: Vec::new(),
                finish_reason: "stop".to_string(),
                usage: ModelUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn legal_memo_sees_earlier_agents_findings_via_the_running_context_buffer() {
        let orchestrator = SessionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MemoReadsRunningContextModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest {
                session_id: None,
                contract_id: None,
                message: "Give me a full compliance and risk memo.".to_string(),
            })
            .await;

        assert!(response.success, "error: {:?}", response.error);
        assert_eq!(response.agent, "LEGAL_MEMO");
        assert_eq!(response.message, "Memo: compliance and risk findings incorporated.");
    }

    /// S6 — agent turn timeout. A hanging ModelClient forces the 30s agent
    /// turn timeout; the turn must still produce a graceful, successful
    /// response rather than aborting the whole request (see executor.rs's
    /// "recoverable at the SessionOrchestrator level" note).
    struct HangingModel;

    #[async_trait::async_trait]
    impl ModelClient for HangingModel {
        async fn generate(
            &self,
            _system: &str,
            _messages: &[ModelMessage],
            _tools: &[ToolDeclaration],
            _options: &GenerateOptions,
        ) -> Result<ModelResponse> {
            tokio::time::sleep(std::time::Duration::from_secs(120)).await;
            unreachable!("the 30s agent turn timeout should fire first")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn s6_agent_turn_timeout_degrades_gracefully() {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator = SessionOrchestrator::new(
            store.clone(),
            Arc::new(HangingModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(30),
            std::time::Duration::from_secs(90),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest { session_id: None, contract_id: None, message: "hello".to_string() })
            .await;

        assert!(response.success, "a timed-out agent turn must still degrade to a graceful response");
        assert!(response.message.to_lowercase().contains("longer than expected"));

        let session_id = Uuid::parse_str(&response.session_id).unwrap();
        let logs = store.list_thinking_logs(session_id, None).await.unwrap();
        assert!(
            logs.iter().any(|l| l.stage == ThinkingStage::Error && l.payload["error"] == "agent_timeout"),
            "expected an agent_timeout ThinkingLog, got: {logs:?}"
        );
    }

    /// spec.md:177 — the 90s whole-request ceiling must fire even when no
    /// single agent turn has timed out yet, by setting `request_timeout`
    /// below the model's sleep but leaving `agent_turn_timeout` well above it.
    #[tokio::test(start_paused = true)]
    async fn s7_whole_request_timeout_fires_independently_of_the_per_agent_timeout() {
        let store = Arc::new(InMemoryStore::new());
        let orchestrator = SessionOrchestrator::new(
            store.clone(),
            Arc::new(HangingModel),
            Arc::new(ToolRegistry::new()),
            Arc::new(AgentCatalog::with_builtins(6)),
            6,
            std::time::Duration::from_secs(300),
            std::time::Duration::from_secs(5),
            false,
        );

        let response = orchestrator
            .handle_chat(ChatRequest { session_id: None, contract_id: None, message: "hello".to_string() })
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("request_timeout"));
        assert!(response.message.to_lowercase().contains("longer than expected"));

        let session_id = Uuid::parse_str(&response.session_id).unwrap();
        let logs = store.list_thinking_logs(session_id, None).await.unwrap();
        assert!(
            logs.iter().any(|l| l.stage == ThinkingStage::Error && l.payload["error"] == "request_timeout"),
            "expected a request_timeout ThinkingLog, got: {logs:?}"
        );
    }
}
