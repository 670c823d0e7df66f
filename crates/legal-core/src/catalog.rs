// AgentCatalog (C5): the six fixed agent identities, each a curated tool
// subset plus system instructions, grounding flag, and model parameters.
// Assembled once at startup and never mutated afterward — mirrors the
// teacher's `CapabilityRegistry::with_builtins()` convention of building an
// immutable registry of named, composable units up front.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::traits::GenerateOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentName {
    Assistant,
    ContractParser,
    LegalResearch,
    ComplianceChecker,
    RiskAssessor,
    LegalMemo,
}

impl AgentName {
    pub const ALL: [AgentName; 6] = [
        AgentName::Assistant,
        AgentName::ContractParser,
        AgentName::LegalResearch,
        AgentName::ComplianceChecker,
        AgentName::RiskAssessor,
        AgentName::LegalMemo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assistant => "ASSISTANT",
            Self::ContractParser => "CONTRACT_PARSER",
            Self::LegalResearch => "LEGAL_RESEARCH",
            Self::ComplianceChecker => "COMPLIANCE_CHECKER",
            Self::RiskAssessor => "RISK_ASSESSOR",
            Self::LegalMemo => "LEGAL_MEMO",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASSISTANT" => Ok(Self::Assistant),
            "CONTRACT_PARSER" => Ok(Self::ContractParser),
            "LEGAL_RESEARCH" => Ok(Self::LegalResearch),
            "COMPLIANCE_CHECKER" => Ok(Self::ComplianceChecker),
            "RISK_ASSESSOR" => Ok(Self::RiskAssessor),
            "LEGAL_MEMO" => Ok(Self::LegalMemo),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: AgentName,
    pub purpose: &'static str,
    pub system_instructions: String,
    pub tool_names: Vec<String>,
    pub grounded_search: bool,
    pub default_options: GenerateOptions,
    pub max_tool_iterations: usize,
}

fn tools(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

const CONTRACT_TOOLS: &[&str] = &["get_contract_by_id", "search_contracts", "save_contract"];
const CLAUSE_TOOLS: &[&str] = &["extract_clauses", "get_clauses_by_type", "save_clauses"];
const COMPLIANCE_TOOLS: &[&str] = &["check_compliance", "get_compliance_rules", "get_applicable_regulations"];
const RISK_TOOLS: &[&str] = &["calculate_clause_risk", "calculate_overall_risk", "get_risk_benchmarks"];
const DOCUMENT_TOOLS: &[&str] = &["generate_document", "list_documents"];
const LOGGING_TOOLS: &[&str] = &["log_thought"];

/// Immutable registry of the six agent identities. Built once at startup
/// from `max_tool_iterations_default` (§6 configuration) and handed to the
/// orchestrator and ContextBuilder by `Arc`.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: HashMap<AgentName, AgentDefinition>,
}

impl AgentCatalog {
    pub fn with_builtins(max_tool_iterations_default: usize) -> Self {
        let mut agents = HashMap::new();

        let mut insert = |name: AgentName, purpose, instructions: &str, tool_list: Vec<&str>, grounded_search, temperature| {
            let mut tool_names: Vec<String> = tool_list.iter().map(|n| n.to_string()).collect();
            tool_names.extend(tools(LOGGING_TOOLS));
            agents.insert(
                name,
                AgentDefinition {
                    name,
                    purpose,
                    system_instructions: instructions.to_string(),
                    tool_names,
                    grounded_search,
                    default_options: GenerateOptions {
                        temperature: Some(temperature),
                        max_output_tokens: Some(2048),
                        grounded_search,
                        ..GenerateOptions::default()
                    },
                    max_tool_iterations: max_tool_iterations_default,
                },
            );
        };

        insert(
            AgentName::Assistant,
            "General chat, clarifications, routing help",
            "You are a helpful legal-assistant concierge. Answer general questions, clarify \
             what the user needs, and point them toward contract analysis, compliance, risk, \
             or legal research when appropriate. You do not have contract tools in this role.",
            vec![],
            false,
            0.7,
        );
        insert(
            AgentName::ContractParser,
            "Extract structure from a contract",
            "You are a contract parsing specialist. Extract clauses from the active contract, \
             classify each by type, and save them via the clause tools so downstream agents can \
             use them.",
            [CONTRACT_TOOLS, CLAUSE_TOOLS].concat(),
            false,
            0.2,
        );
        insert(
            AgentName::LegalResearch,
            "Answer legal questions with web citations",
            "You are a legal research assistant. Use grounded web search to answer legal \
             questions precisely and always cite your sources.",
            vec![],
            true,
            0.4,
        );
        insert(
            AgentName::ComplianceChecker,
            "Map contract/clauses against a regulation",
            "You are a compliance specialist. Given a contract's clauses and a named \
             regulation, fetch the applicable rules and report a rule-by-rule verdict.",
            [COMPLIANCE_TOOLS, CLAUSE_TOOLS].concat(),
            false,
            0.2,
        );
        insert(
            AgentName::RiskAssessor,
            "Score clauses and aggregate risk",
            "You are a contract risk analyst. Score each clause's risk and aggregate an \
             overall risk assessment for the contract.",
            [RISK_TOOLS, CLAUSE_TOOLS].concat(),
            false,
            0.2,
        );
        insert(
            AgentName::LegalMemo,
            "Synthesize a memo from prior agent outputs",
            "You are a legal writer. Synthesize the prior agents' findings into a single \
             coherent memo and generate the corresponding document.",
            DOCUMENT_TOOLS.to_vec(),
            false,
            0.5,
        );

        Self { agents }
    }

    pub fn get(&self, name: AgentName) -> &AgentDefinition {
        self.agents
            .get(&name)
            .expect("AgentCatalog::with_builtins populates all six agents")
    }

    /// The agent the orchestrator treats as the designated synthesizer of a
    /// pipeline's final output, when present (§4.8 step 4).
    pub fn designated_synthesizer(&self) -> AgentName {
        AgentName::LegalMemo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_agent_carries_the_logging_tool() {
        let catalog = AgentCatalog::with_builtins(6);
        for name in AgentName::ALL {
            assert!(catalog.get(name).tool_names.iter().any(|t| t == "log_thought"));
        }
    }

    #[test]
    fn only_legal_research_requests_grounded_search() {
        let catalog = AgentCatalog::with_builtins(6);
        for name in AgentName::ALL {
            let grounded = catalog.get(name).grounded_search;
            assert_eq!(grounded, name == AgentName::LegalResearch);
        }
    }

    #[test]
    fn agent_name_round_trips_through_its_string_form() {
        for name in AgentName::ALL {
            assert_eq!(name.as_str().parse::<AgentName>().unwrap(), name);
        }
    }
}
