// In-memory doubles for `Store`, `BlobStore`, and `ModelClient`, used by
// unit and scenario tests throughout this crate and downstream crates.
// Mirrors the teacher's `InMemoryMessageStore`/`MockLlmProvider` convention:
// deterministic, scriptable, no I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{Clause, ComplianceRule, Contract, GeneratedDocument, Message, Session, ThinkingLog};
use crate::error::{OrchestratorError, Result};
use crate::tool_types::{ToolCall, ToolDeclaration};
use crate::traits::{BlobStore, GenerateOptions, ModelClient, ModelMessage, ModelResponse, ModelUsage, Store};

#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    messages: Mutex<HashMap<Uuid, Vec<Message>>>,
    contracts: Mutex<HashMap<Uuid, Contract>>,
    clauses: Mutex<HashMap<Uuid, Vec<Clause>>>,
    thinking_logs: Mutex<HashMap<Uuid, Vec<ThinkingLog>>>,
    documents: Mutex<HashMap<Uuid, Vec<GeneratedDocument>>>,
    compliance_rules: Mutex<Vec<ComplianceRule>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compliance_rules(rules: Vec<ComplianceRule>) -> Self {
        let store = Self::default();
        *store.compliance_rules.try_lock().expect("freshly created mutex is uncontended") = rules;
        store
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_session(&self, session: Session) -> Result<Session> {
        self.sessions.lock().await.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(&id).cloned())
    }

    async fn set_active_contract(&self, session_id: Uuid, contract_id: Option<Uuid>) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| OrchestratorError::invalid_request("unknown session"))?;
        session.active_contract_id = contract_id;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn create_message(&self, message: Message) -> Result<Message> {
        let mut messages = self.messages.lock().await;
        messages.entry(message.session_id).or_default().push(message.clone());
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&message.session_id) {
            session.message_count += 1;
            session.updated_at = Utc::now();
        }
        Ok(message)
    }

    async fn list_messages(&self, session_id: Uuid, limit: usize, before: Option<DateTime<Utc>>) -> Result<Vec<Message>> {
        let messages = self.messages.lock().await;
        let mut matching: Vec<Message> = messages
            .get(&session_id)
            .into_iter()
            .flatten()
            .filter(|m| before.map(|cutoff| m.created_at < cutoff).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by_key(|m| m.created_at);
        if matching.len() > limit {
            let skip = matching.len() - limit;
            matching.drain(0..skip);
        }
        Ok(matching)
    }

    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        Ok(self.contracts.lock().await.get(&id).cloned())
    }

    async fn search_contracts(&self, query: &str) -> Result<Vec<Contract>> {
        let needle = query.to_lowercase();
        Ok(self
            .contracts
            .lock()
            .await
            .values()
            .filter(|c| c.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn save_contract(&self, contract: Contract) -> Result<Contract> {
        self.contracts.lock().await.insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn list_clauses(&self, contract_id: Uuid) -> Result<Vec<Clause>> {
        Ok(self.clauses.lock().await.get(&contract_id).cloned().unwrap_or_default())
    }

    async fn save_clauses(&self, contract_id: Uuid, clauses: Vec<Clause>) -> Result<Vec<Clause>> {
        self.clauses.lock().await.insert(contract_id, clauses.clone());
        Ok(clauses)
    }

    async fn append_thinking_logs(&self, logs: Vec<ThinkingLog>) -> Result<()> {
        let mut store = self.thinking_logs.lock().await;
        for log in logs {
            store.entry(log.session_id).or_default().push(log);
        }
        Ok(())
    }

    async fn list_thinking_logs(&self, session_id: Uuid, turn_id: Option<Uuid>) -> Result<Vec<ThinkingLog>> {
        let store = self.thinking_logs.lock().await;
        Ok(store
            .get(&session_id)
            .into_iter()
            .flatten()
            .filter(|log| turn_id.map(|t| log.turn_id == t).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn save_generated_document(&self, document: GeneratedDocument) -> Result<GeneratedDocument> {
        self.documents.lock().await.entry(document.session_id).or_default().push(document.clone());
        Ok(document)
    }

    async fn list_documents(&self, session_id: Uuid) -> Result<Vec<GeneratedDocument>> {
        Ok(self.documents.lock().await.get(&session_id).cloned().unwrap_or_default())
    }

    async fn list_compliance_rules(&self, regulation: &str) -> Result<Vec<ComplianceRule>> {
        Ok(self
            .compliance_rules
            .lock()
            .await
            .iter()
            .filter(|r| r.regulation.eq_ignore_ascii_case(regulation))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let uri = format!("memory://{key}");
        self.blobs.lock().await.insert(uri.clone(), bytes);
        Ok(uri)
    }

    async fn get(&self, uri: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(uri)
            .cloned()
            .ok_or_else(|| OrchestratorError::invalid_request(format!("no such blob: {uri}")))
    }
}

/// A single scripted reply. `tool_requests` lets a scenario test simulate a
/// model that calls one or more tools before finishing.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub content: String,
    pub tool_requests: Vec<ToolCall>,
}

impl ScriptedResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), tool_requests: Vec::new() }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            content: String::new(),
            tool_requests: vec![ToolCall { id: format!("call_{}", Uuid::now_v7()), name: name.into(), arguments }],
        }
    }
}

/// Deterministic `ModelClient` double. Replies are consumed in order from a
/// fixed script; the last entry repeats once the script is exhausted so a
/// misconfigured iteration count degrades gracefully instead of panicking.
pub struct InMemoryModelClient {
    script: Mutex<Vec<ScriptedResponse>>,
}

impl InMemoryModelClient {
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        assert!(!script.is_empty(), "InMemoryModelClient needs at least one scripted response");
        Self { script: Mutex::new(script) }
    }

    pub fn always(response: ScriptedResponse) -> Self {
        Self { script: Mutex::new(vec![response]) }
    }
}

#[async_trait]
impl ModelClient for InMemoryModelClient {
    async fn generate(
        &self,
        _system: &str,
        _messages: &[ModelMessage],
        _tools: &[ToolDeclaration],
        _options: &GenerateOptions,
    ) -> Result<ModelResponse> {
        let mut script = self.script.lock().await;
        let next = if script.len() > 1 { script.remove(0) } else { script[0].clone() };
        Ok(ModelResponse {
            content_parts: vec![next.content],
            tool_requests: next.tool_requests,
            citations: Vec::new(),
            finish_reason: "stop".to_string(),
            usage: ModelUsage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MessageRole;

    #[tokio::test]
    async fn create_and_list_messages_preserves_order() {
        let store = InMemoryStore::new();
        let session = store.create_session(Session::new()).await.unwrap();
        store.create_message(Message::user(session.id, "hi")).await.unwrap();
        store.create_message(Message::assistant(session.id, "ASSISTANT", "hello")).await.unwrap();
        let messages = store.list_messages(session.id, 10, None).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn create_message_increments_session_count() {
        let store = InMemoryStore::new();
        let session = store.create_session(Session::new()).await.unwrap();
        store.create_message(Message::user(session.id, "hi")).await.unwrap();
        let reloaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(reloaded.message_count, 1);
    }

    #[tokio::test]
    async fn scripted_model_client_returns_tool_requests_then_final_text() {
        let client = InMemoryModelClient::new(vec![
            ScriptedResponse::tool_call("get_contract_by_id", serde_json::json!({"contract_id": "c1"})),
            ScriptedResponse::text("done"),
        ]);
        let first = client.generate("sys", &[], &[], &GenerateOptions::default()).await.unwrap();
        assert!(first.has_tool_requests());
        let second = client.generate("sys", &[], &[], &GenerateOptions::default()).await.unwrap();
        assert_eq!(second.text(), "done");
    }
}
