// Concrete Tool implementations for the six tool groups named in §4.1.
// Each group is a small struct holding whatever backend handles it needs
// (Store, BlobStore) and registers its tools under fixed names via
// `register_builtins`. Handlers never see the raw HTTP/transport layer —
// only validated arguments and a ToolContext.

mod clause;
mod compliance;
mod contract;
mod document;
mod logging;
mod risk;

use std::sync::Arc;

use crate::tools::ToolRegistry;
use crate::traits::{BlobStore, Store};

pub fn register_builtins(registry: &mut ToolRegistry, store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) {
    registry.register(contract::GetContractById::new(store.clone()));
    registry.register(contract::SearchContracts::new(store.clone()));
    registry.register(contract::SaveContract::new(store.clone()));

    registry.register(clause::ExtractClauses::new(store.clone(), blobs.clone()));
    registry.register(clause::GetClausesByType::new(store.clone()));
    registry.register(clause::SaveClauses::new(store.clone()));

    registry.register(compliance::CheckCompliance::new(store.clone()));
    registry.register(compliance::GetComplianceRules::new(store.clone()));
    registry.register(compliance::GetApplicableRegulations::new(store.clone()));

    registry.register(risk::CalculateClauseRisk::new(store.clone()));
    registry.register(risk::CalculateOverallRisk::new(store.clone()));
    registry.register(risk::GetRiskBenchmarks);

    registry.register(document::GenerateDocument::new(store.clone(), blobs));
    registry.register(document::ListDocuments::new(store));

    registry.register(logging::LogThought);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBlobStore, InMemoryStore};

    #[test]
    fn register_builtins_wires_up_every_named_tool() {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, Arc::new(InMemoryStore::new()), Arc::new(InMemoryBlobStore::default()));

        for name in [
            "get_contract_by_id",
            "search_contracts",
            "save_contract",
            "extract_clauses",
            "get_clauses_by_type",
            "save_clauses",
            "check_compliance",
            "get_compliance_rules",
            "get_applicable_regulations",
            "calculate_clause_risk",
            "calculate_overall_risk",
            "get_risk_benchmarks",
            "generate_document",
            "list_documents",
            "log_thought",
        ] {
            assert!(registry.get(name).is_some(), "missing tool: {name}");
        }
    }
}
