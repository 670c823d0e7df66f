use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::{ComplianceStatus, Contract, ContractStatus, Party};
use crate::tools::{Tool, ToolContext, ToolOutcome};
use crate::traits::Store;

pub struct GetContractById {
    store: Arc<dyn Store>,
}

impl GetContractById {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetContractById {
    fn name(&self) -> &str {
        "get_contract_by_id"
    }

    fn description(&self) -> &str {
        "Fetch a contract and its current status by id."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"contract_id": {"type": "string"}}, "required": ["contract_id"]})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(id) = arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };

        match self.store.get_contract(id).await {
            Ok(Some(contract)) => ToolOutcome::success(json!(contract)),
            Ok(None) => ToolOutcome::tool_error(format!("no contract found for id {id}")),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

pub struct SearchContracts {
    store: Arc<dyn Store>,
}

impl SearchContracts {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchContracts {
    fn name(&self) -> &str {
        "search_contracts"
    }

    fn description(&self) -> &str {
        "Search contracts by title substring."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(query) = arguments.get("query").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("query must be a string");
        };

        match self.store.search_contracts(query).await {
            Ok(contracts) => ToolOutcome::success(json!(contracts)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

pub struct SaveContract {
    store: Arc<dyn Store>,
}

impl SaveContract {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveContract {
    fn name(&self) -> &str {
        "save_contract"
    }

    fn description(&self) -> &str {
        "Create or update a contract record."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string"},
                "contract_type": {"type": "string"},
                "parties": {"type": "array"},
                "file_uri": {"type": "string"},
                "status": {"type": "string"}
            },
            "required": ["title", "file_uri"]
        })
    }

    fn side_effecting(&self) -> bool {
        true
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(title) = arguments.get("title").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("title must be a string");
        };
        let Some(file_uri) = arguments.get("file_uri").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("file_uri must be a string");
        };

        let id = arguments
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::now_v7);

        let parties: Vec<Party> = match arguments.get("parties") {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(parties) => parties,
                Err(_) => return ToolOutcome::tool_error("parties must be an array of {name, role?} records"),
            },
            None => Vec::new(),
        };

        let status = match arguments.get("status").and_then(Value::as_str) {
            Some("parsing") => ContractStatus::Parsing,
            Some("ready") => ContractStatus::Ready,
            Some("failed") => ContractStatus::Failed,
            _ => ContractStatus::Uploaded,
        };

        let existing = self.store.get_contract(id).await.ok().flatten();

        let contract = Contract {
            id,
            title: title.to_string(),
            contract_type: arguments.get("contract_type").and_then(Value::as_str).map(str::to_string),
            parties,
            uploaded_at: existing.as_ref().map(|c| c.uploaded_at).unwrap_or_else(chrono::Utc::now),
            file_uri: file_uri.to_string(),
            status,
            overall_risk_score: existing.as_ref().and_then(|c| c.overall_risk_score),
            compliance_status: existing.map(|c| c.compliance_status).unwrap_or(ComplianceStatus::Unknown),
        };

        match self.store.save_contract(contract).await {
            Ok(saved) => ToolOutcome::success(json!(saved)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}
