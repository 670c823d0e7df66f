use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::tools::{Tool, ToolContext, ToolOutcome};
use crate::traits::Store;

const KNOWN_REGULATIONS: &[&str] = &["GDPR", "HIPAA", "CCPA"];

pub struct CheckCompliance {
    store: Arc<dyn Store>,
}

impl CheckCompliance {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckCompliance {
    fn name(&self) -> &str {
        "check_compliance"
    }

    fn description(&self) -> &str {
        "Check a contract's clauses against a regulation, rule by rule."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"regulation": {"type": "string"}, "contract_id": {"type": "string"}},
            "required": ["regulation", "contract_id"]
        })
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(regulation) = arguments.get("regulation").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("regulation must be a string");
        };
        let Some(contract_id) =
            arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };

        let rules = match self.store.list_compliance_rules(regulation).await {
            Ok(rules) => rules,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };
        if rules.is_empty() {
            return ToolOutcome::tool_error(format!("no rules known for regulation {regulation}"));
        }

        let clauses = match self.store.list_clauses(contract_id).await {
            Ok(clauses) => clauses,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };
        let clause_text = clauses.iter().map(|c| c.text.to_lowercase()).collect::<Vec<_>>().join(" ");

        let verdicts: Vec<Value> = rules
            .into_iter()
            .map(|rule| {
                let category_mentioned = clause_text.contains(&rule.category.replace('_', " "));
                let status = if category_mentioned { "addressed" } else { "not_addressed" };
                json!({
                    "rule_id": rule.rule_id,
                    "regulation": rule.regulation,
                    "category": rule.category,
                    "severity": rule.severity,
                    "status": status,
                })
            })
            .collect();

        ToolOutcome::success(json!({"regulation": regulation, "contract_id": contract_id, "verdicts": verdicts}))
    }
}

pub struct GetComplianceRules {
    store: Arc<dyn Store>,
}

impl GetComplianceRules {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetComplianceRules {
    fn name(&self) -> &str {
        "get_compliance_rules"
    }

    fn description(&self) -> &str {
        "List the known compliance rules for a regulation."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"regulation": {"type": "string"}}, "required": ["regulation"]})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(regulation) = arguments.get("regulation").and_then(Value::as_str) else {
            return ToolOutcome::tool_error("regulation must be a string");
        };

        match self.store.list_compliance_rules(regulation).await {
            Ok(rules) => ToolOutcome::success(json!(rules)),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

pub struct GetApplicableRegulations {
    store: Arc<dyn Store>,
}

impl GetApplicableRegulations {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetApplicableRegulations {
    fn name(&self) -> &str {
        "get_applicable_regulations"
    }

    fn description(&self) -> &str {
        "List the regulations with known rules that apply to a contract."
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

        let mut applicable = Vec::new();
        for regulation in KNOWN_REGULATIONS {
            match self.store.list_compliance_rules(regulation).await {
                Ok(rules) if !rules.is_empty() => applicable.push(*regulation),
                Ok(_) => {}
                Err(e) => return ToolOutcome::internal_error(e.to_string()),
            }
        }

        ToolOutcome::success(json!({"contract_type": contract.contract_type, "applicable_regulations": applicable}))
    }
}
