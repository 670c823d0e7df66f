use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::Clause;
use crate::tools::{Tool, ToolContext, ToolOutcome};
use crate::traits::{BlobStore, Store};

/// Keyword -> clause type, checked in order against each paragraph. This is
/// a heuristic stand-in for a real document-parsing pipeline; good enough to
/// route paragraphs to a type the downstream agents can reason about.
const CLAUSE_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("indemnif", "indemnification"),
    ("terminat", "termination"),
    ("confidential", "confidentiality"),
    ("liab", "limitation_of_liability"),
    ("govern", "governing_law"),
    ("payment", "payment"),
    ("warrant", "warranty"),
    ("intellectual property", "intellectual_property"),
    ("assign", "assignment"),
    ("dispute", "dispute_resolution"),
];

fn classify_paragraph(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CLAUSE_TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, clause_type)| *clause_type)
        .unwrap_or("general")
}

pub struct ExtractClauses {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl ExtractClauses {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }
}

#[async_trait]
impl Tool for ExtractClauses {
    fn name(&self) -> &str {
        "extract_clauses"
    }

    fn description(&self) -> &str {
        "Split the contract's stored document into candidate clauses, tagged by type. Does not persist; call save_clauses to keep them."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"contract_id": {"type": "string"}}, "required": ["contract_id"]})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(contract_id) =
            arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };

        let contract = match self.store.get_contract(contract_id).await {
            Ok(Some(contract)) => contract,
            Ok(None) => return ToolOutcome::tool_error(format!("no contract found for id {contract_id}")),
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };

        let bytes = match self.blobs.get(&contract.file_uri).await {
            Ok(bytes) => bytes,
            Err(e) => return ToolOutcome::tool_error(format!("could not read contract document: {e}")),
        };

        let text = String::from_utf8_lossy(&bytes);
        let clauses: Vec<Clause> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
            .map(|(index, paragraph)| Clause {
                id: Uuid::now_v7(),
                contract_id,
                index: index as i32,
                clause_type: classify_paragraph(paragraph).to_string(),
                text: paragraph.to_string(),
                risk_score: None,
                notes: None,
            })
            .collect();

        if clauses.is_empty() {
            return ToolOutcome::tool_error("document contained no extractable paragraphs");
        }

        ToolOutcome::success(json!(clauses))
    }
}

pub struct GetClausesByType {
    store: Arc<dyn Store>,
}

impl GetClausesByType {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetClausesByType {
    fn name(&self) -> &str {
        "get_clauses_by_type"
    }

    fn description(&self) -> &str {
        "List a contract's saved clauses, optionally filtered by clause type."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"contract_id": {"type": "string"}, "type": {"type": "string"}},
            "required": ["contract_id"]
        })
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(contract_id) =
            arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };

        let clauses = match self.store.list_clauses(contract_id).await {
            Ok(clauses) => clauses,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };

        let filtered: Vec<&Clause> = match arguments.get("type").and_then(Value::as_str) {
            Some(clause_type) => clauses.iter().filter(|c| c.clause_type == clause_type).collect(),
            None => clauses.iter().collect(),
        };

        ToolOutcome::success(json!(filtered))
    }
}

pub struct SaveClauses {
    store: Arc<dyn Store>,
}

impl SaveClauses {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveClauses {
    fn name(&self) -> &str {
        "save_clauses"
    }

    fn description(&self) -> &str {
        "Replace a contract's saved clauses with the given set."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"contract_id": {"type": "string"}, "clauses": {"type": "array"}},
            "required": ["contract_id", "clauses"]
        })
    }

    fn side_effecting(&self) -> bool {
        true
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(contract_id) =
            arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };

        let Some(raw_clauses) = arguments.get("clauses") else {
            return ToolOutcome::tool_error("clauses must be an array");
        };

        let clauses: Vec<Clause> = match serde_json::from_value(raw_clauses.clone()) {
            Ok(clauses) => clauses,
            Err(e) => return ToolOutcome::tool_error(format!("invalid clause shape: {e}")),
        };

        match self.store.save_clauses(contract_id, clauses).await {
            Ok(saved) => ToolOutcome::success(json!(saved)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}
