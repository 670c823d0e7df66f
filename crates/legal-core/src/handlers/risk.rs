use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::tools::{Tool, ToolContext, ToolOutcome};
use crate::traits::Store;

/// Keyword -> risk weight, summed and clamped to [0, 1]. A heuristic stand-in
/// for a trained risk model; deterministic, which is what the bounded tool
/// loop and its tests need.
const RISK_KEYWORDS: &[(&str, f32)] = &[
    ("indemnif", 0.3),
    ("unlimited liability", 0.4),
    ("sole discretion", 0.2),
    ("non-negotiable", 0.15),
    ("terminate immediately", 0.25),
    ("penalt", 0.2),
    ("waive", 0.2),
    ("perpetual", 0.15),
];

fn score_text(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let raw: f32 = RISK_KEYWORDS.iter().filter(|(kw, _)| lower.contains(kw)).map(|(_, w)| *w).sum();
    raw.clamp(0.0, 1.0)
}

pub struct CalculateClauseRisk {
    store: Arc<dyn Store>,
}

impl CalculateClauseRisk {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CalculateClauseRisk {
    fn name(&self) -> &str {
        "calculate_clause_risk"
    }

    fn description(&self) -> &str {
        "Score one clause's risk on a 0.0-1.0 scale from its text."
    }

    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"contract_id": {"type": "string"}, "clause_id": {"type": "string"}},
            "required": ["contract_id", "clause_id"]
        })
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let Some(contract_id) =
            arguments.get("contract_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("contract_id must be a valid uuid");
        };
        let Some(clause_id) = arguments.get("clause_id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
        else {
            return ToolOutcome::tool_error("clause_id must be a valid uuid");
        };

        let clauses = match self.store.list_clauses(contract_id).await {
            Ok(clauses) => clauses,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };
        let Some(clause) = clauses.into_iter().find(|c| c.id == clause_id) else {
            return ToolOutcome::tool_error(format!("no clause found for id {clause_id}"));
        };

        let risk_score = score_text(&clause.text);
        ToolOutcome::success(json!({"clause_id": clause_id, "risk_score": risk_score}))
    }
}

pub struct CalculateOverallRisk {
    store: Arc<dyn Store>,
}

impl CalculateOverallRisk {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CalculateOverallRisk {
    fn name(&self) -> &str {
        "calculate_overall_risk"
    }

    fn description(&self) -> &str {
        "Aggregate a contract's overall risk from its scored clauses and persist it to the contract record."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"contract_id": {"type": "string"}}, "required": ["contract_id"]})
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

        let clauses = match self.store.list_clauses(contract_id).await {
            Ok(clauses) => clauses,
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };
        let scored: Vec<f32> = clauses.iter().filter_map(|c| c.risk_score).collect();
        if scored.is_empty() {
            return ToolOutcome::tool_error("no scored clauses yet; call calculate_clause_risk and save_clauses first");
        }
        let overall = scored.iter().sum::<f32>() / scored.len() as f32;

        let contract = match self.store.get_contract(contract_id).await {
            Ok(Some(mut contract)) => {
                contract.overall_risk_score = Some(overall);
                contract
            }
            Ok(None) => return ToolOutcome::tool_error(format!("no contract found for id {contract_id}")),
            Err(e) => return ToolOutcome::internal_error(e.to_string()),
        };

        match self.store.save_contract(contract).await {
            Ok(saved) => ToolOutcome::success(json!({"contract_id": contract_id, "overall_risk_score": saved.overall_risk_score})),
            Err(e) => ToolOutcome::internal_error(e.to_string()),
        }
    }
}

pub struct GetRiskBenchmarks;

#[async_trait]
impl Tool for GetRiskBenchmarks {
    fn name(&self) -> &str {
        "get_risk_benchmarks"
    }

    fn description(&self) -> &str {
        "Return reference risk benchmarks by clause type, for comparison."
    }

    fn parameter_schema(&self) -> Value {
        json!({"type": "object", "properties": {"clause_type": {"type": "string"}}})
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolOutcome {
        let benchmarks = json!({
            "indemnification": 0.7,
            "limitation_of_liability": 0.6,
            "termination": 0.4,
            "confidentiality": 0.3,
            "payment": 0.3,
            "governing_law": 0.1,
            "general": 0.2,
        });

        match arguments.get("clause_type").and_then(Value::as_str) {
            Some(clause_type) => match benchmarks.get(clause_type) {
                Some(value) => ToolOutcome::success(json!({"clause_type": clause_type, "benchmark": value})),
                None => ToolOutcome::tool_error(format!("no benchmark known for clause type {clause_type}")),
            },
            None => ToolOutcome::success(benchmarks),
        }
    }
}
