// Abstract boundaries the orchestration runtime is built against:
// Store (C2), BlobStore, and ModelClient (C3). Production adapters live in
// sibling crates (`legal-storage`, `legal-llm-gemini`); in-memory doubles
// for tests live in `memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    Citation, Clause, ComplianceRule, Contract, GeneratedDocument, Message, Session, ThinkingLog,
};
use crate::error::Result;
use crate::tool_types::{ToolCall, ToolDeclaration, ToolResult};

// ============================================================================
// Store — typed accessors over the document database
// ============================================================================

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<Session>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;
    async fn set_active_contract(&self, session_id: Uuid, contract_id: Option<Uuid>) -> Result<()>;

    async fn create_message(&self, message: Message) -> Result<Message>;
    async fn list_messages(&self, session_id: Uuid, limit: usize, before: Option<DateTime<Utc>>) -> Result<Vec<Message>>;

    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>>;
    async fn search_contracts(&self, query: &str) -> Result<Vec<Contract>>;
    async fn save_contract(&self, contract: Contract) -> Result<Contract>;

    async fn list_clauses(&self, contract_id: Uuid) -> Result<Vec<Clause>>;
    async fn save_clauses(&self, contract_id: Uuid, clauses: Vec<Clause>) -> Result<Vec<Clause>>;

    async fn append_thinking_logs(&self, logs: Vec<ThinkingLog>) -> Result<()>;
    async fn list_thinking_logs(&self, session_id: Uuid, turn_id: Option<Uuid>) -> Result<Vec<ThinkingLog>>;

    async fn save_generated_document(&self, document: GeneratedDocument) -> Result<GeneratedDocument>;
    async fn list_documents(&self, session_id: Uuid) -> Result<Vec<GeneratedDocument>>;

    async fn list_compliance_rules(&self, regulation: &str) -> Result<Vec<ComplianceRule>>;
}

// ============================================================================
// BlobStore — object storage for uploaded PDFs and generated documents
// ============================================================================

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
    async fn get(&self, uri: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// ModelClient — normalized LLM calls
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone)]
pub struct ModelMessage {
    pub role: ModelMessageRole,
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
}

impl ModelMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ModelMessageRole::User, content: content.into(), tool_calls: None, tool_call_id: None }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self { role: ModelMessageRole::Assistant, content: content.into(), tool_calls: Some(tool_calls), tool_call_id: None }
    }

    pub fn tool_result(result: &ToolResult) -> Self {
        let content = result
            .error
            .clone()
            .unwrap_or_else(|| serde_json::to_string(&result.result).unwrap_or_default());
        Self {
            role: ModelMessageRole::Tool,
            content,
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub grounded_search: bool,
    #[serde(default)]
    pub response_mime: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: None,
            top_k: None,
            max_output_tokens: None,
            grounded_search: false,
            response_mime: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content_parts: Vec<String>,
    pub tool_requests: Vec<ToolCall>,
    pub citations: Vec<Citation>,
    pub finish_reason: String,
    pub usage: ModelUsage,
}

impl ModelResponse {
    pub fn text(&self) -> String {
        self.content_parts.join("")
    }

    pub fn has_tool_requests(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

/// Enough state to resume a conversation after a round of tool dispatch.
/// `continue_with_tool_results` appends the tool outcomes and replays the
/// transcript; this is sufficient for providers with no native multi-turn
/// tool-call session, and is not more than what providers with one need.
#[derive(Debug, Clone)]
pub struct ModelTurnState {
    pub system: String,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDeclaration>,
    pub options: GenerateOptions,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        messages: &[ModelMessage],
        tools: &[ToolDeclaration],
        options: &GenerateOptions,
    ) -> Result<ModelResponse>;

    /// Default implementation replays the full transcript with the tool
    /// results appended as tool messages. Providers with a native
    /// multi-turn tool-call session may override this.
    async fn continue_with_tool_results(
        &self,
        state: &ModelTurnState,
        results: &[ToolResult],
    ) -> Result<ModelResponse> {
        let mut messages = state.messages.clone();
        for result in results {
            messages.push(ModelMessage::tool_result(result));
        }
        self.generate(&state.system, &messages, &state.tools, &state.options).await
    }
}
