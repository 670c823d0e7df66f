use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::{GeneratedDocument, GeneratedDocumentKind};
use crate::tools::{Tool, ToolContext, ToolOutcome};
use crate::traits::{BlobStore, Store};

pub struct GenerateDocument {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl GenerateDocument {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }
}

#[async_trait]
impl Tool for GenerateDocument {
    fn name(&self) -> &str {
        "generate_document"
    }

    fn description(&self) -> &str {
        "Persist generated content (a memo, summary, or compliance report) as a document attached to the session."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "kind": {"type": "string", "enum": ["memo", "summary", "compliance_report"]},
                "session_id": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["kind", "session_id", "content"]
        })
    }

    fn side_effecting(&self) -> bool {
        true
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolOutcome {
        let kind = match arguments.get("kind").and_then(Value::as_str) {
            Some("memo") => GeneratedDocumentKind::Memo,
            Some("summary") => GeneratedDocumentKind::Summary,
            Some("compliance_report") => GeneratedDocumentKind::ComplianceReport,
            _ => return ToolOutcome::tool_error("kind must be one of memo, summary, compliance_report"),
        };
        let Some(session_id) = arguments.get("session_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("session_id must be a valid uuid");
        };
        let Some(content) = arguments.get("content").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("content must be a string");
        };

        let document_id = Uuid::now_v7();
        let key = format!("documents/{session_id}/{document_id}.txt");
        let file_uri = match self.blobs.put(&key, content.as_bytes().to_vec(), "text/plain").await {
            Ok(uri) => uri,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };

        let document = GeneratedDocument { id: document_id, session_id, kind, file_uri, created_at: chrono::Utc::now() };

        debug_assert_eq!(document.session_id, ctx.session_id, "generate_document session_id must match the turn");

        match self.store.save_generated_document(document).await {
            Ok(saved) => ToolOutcome::success(json!(saved)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

pub struct ListDocuments {
    store: Arc<dyn Store>,
}

impl ListDocuments {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDocuments {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List documents generated for a session."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"session_id": {"type": "string"}}, "required": ["session_id"]})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(session_id) = arguments.get("session_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("session_id must be a valid uuid");
        };

        match self.store.list_documents(session_id).await {
            Ok(documents) => ToolOutcome::success(json!(documents)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBlobStore, InMemoryStore};

    fn ctx_for(session_id: Uuid) -> ToolContext {
        ToolContext {
            session_id,
            turn_id: Uuid::now_v7(),
            active_contract_id: None,
            logger: Arc::new(crate::logging::ThinkingLogger::new(Uuid::now_v7(), session_id)),
        }
    }

    #[tokio::test]
    async fn generate_document_persists_content_and_a_record() {
        let store = Arc::new(InMemoryStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let session_id = Uuid::now_v7();

        let tool = GenerateDocument::new(store.clone(), blobs.clone());
        let outcome = tool
            .call(json!({"kind": "memo", "session_id": session_id, "content": "A short memo."}), &ctx_for(session_id))
            .await;

        let saved = match outcome {
            ToolOutcome::Success(value) => value,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(saved["kind"], "memo");

        let documents = store.list_documents(session_id).await.unwrap();
        assert_eq!(documents.len(), 1);
        let bytes = blobs.get(&documents[0].file_uri).await.unwrap();
        assert_eq!(bytes, b"A short memo.");
    }

    #[tokio::test]
    async fn generate_document_rejects_an_unknown_kind() {
        let store = Arc::new(InMemoryStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let session_id = Uuid::now_v7();

        let tool = GenerateDocument::new(store, blobs);
        let outcome = tool
            .call(json!({"kind": "not_a_kind", "session_id": session_id, "content": "x"}), &ctx_for(session_id))
            .await;
        assert!(matches!(outcome, ToolOutcome::ToolError(_)));
    }

    #[tokio::test]
    async fn list_documents_is_empty_for_a_session_with_none_generated() {
        let store = Arc::new(InMemoryStore::new());
        let session_id = Uuid::now_v7();
        let tool = ListDocuments::new(store);
        let outcome = tool.call(json!({"session_id": session_id}), &ctx_for(session_id)).await;
        match outcome {
            ToolOutcome::Success(value) => assert!(value.as_array().unwrap().is_empty()),
            other => panic!("expected success, got {other:?}"),
        }
    }
}
