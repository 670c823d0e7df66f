// QueryClassifier (C6): maps a user utterance to an ordered agent pipeline
// and a query-type label. A deterministic keyword/regex layer runs first;
// only when it can't decide does the caller fall back to a one-shot model
// classification call (see `classify_with_model`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::AgentName;
use crate::error::Result;
use crate::traits::{GenerateOptions, ModelClient, ModelMessage};

#[derive(Debug, Clone)]
pub struct ClassifierSnapshot {
    pub active_contract_present: bool,
    pub conversation_length: usize,
    pub clauses_exist_for_active_contract: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub pipeline: Vec<AgentName>,
    pub query_type: String,
}

struct Rule {
    query_type: &'static str,
    pattern: Lazy<Regex>,
}

macro_rules! rule {
    ($query_type:literal, $pattern:literal) => {
        Rule {
            query_type: $query_type,
            pattern: Lazy::new(|| Regex::new($pattern).expect("valid classifier regex")),
        }
    };
}

static GREETING: Rule = rule!("greeting", r"(?i)^\s*(hi|hello|hey|good (morning|afternoon|evening))\b");
static PARSE: Rule = rule!("contract_parse", r"(?i)\b(analyze|parse|extract|summarize)\b");
static COMPLIANCE: Rule = rule!("compliance", r"(?i)\bcompliance|gdpr|hipaa|ccpa|sox\b");
static RISK: Rule = rule!("risk", r"(?i)\brisk\b");
static MEMO: Rule = rule!("full_analysis", r"(?i)\b(full analysis|memo)\b");
static LEGAL_QUESTION: Rule = rule!("legal_question", r"(?i)^\s*what is\b|\bclause\b.*\?");

pub struct QueryClassifier;

impl QueryClassifier {
    /// The deterministic rule-based layer. Returns `None` when no rule
    /// matches, signaling the caller should fall back to a model call.
    pub fn classify_rule_based(message: &str, snapshot: &ClassifierSnapshot) -> Option<Classification> {
        let with_parser_prefix = |mut pipeline: Vec<AgentName>| {
            if snapshot.active_contract_present && !snapshot.clauses_exist_for_active_contract {
                pipeline.insert(0, AgentName::ContractParser);
            }
            pipeline
        };

        if GREETING.pattern.is_match(message) {
            return Some(Classification { pipeline: vec![AgentName::Assistant], query_type: GREETING.query_type.into() });
        }
        if MEMO.pattern.is_match(message) {
            return Some(Classification {
                pipeline: with_parser_prefix(vec![AgentName::ComplianceChecker, AgentName::RiskAssessor, AgentName::LegalMemo]),
                query_type: MEMO.query_type.into(),
            });
        }
        if COMPLIANCE.pattern.is_match(message) {
            return Some(Classification {
                pipeline: with_parser_prefix(vec![AgentName::ComplianceChecker]),
                query_type: COMPLIANCE.query_type.into(),
            });
        }
        if RISK.pattern.is_match(message) {
            return Some(Classification {
                pipeline: with_parser_prefix(vec![AgentName::RiskAssessor]),
                query_type: RISK.query_type.into(),
            });
        }
        if PARSE.pattern.is_match(message) && snapshot.active_contract_present {
            return Some(Classification { pipeline: vec![AgentName::ContractParser], query_type: PARSE.query_type.into() });
        }
        if LEGAL_QUESTION.pattern.is_match(message) && !snapshot.active_contract_present {
            return Some(Classification { pipeline: vec![AgentName::LegalResearch], query_type: LEGAL_QUESTION.query_type.into() });
        }

        None
    }

    /// One-shot LLM classification with a tightly constrained output
    /// schema, used only when the rule layer is ambiguous.
    pub async fn classify_with_model(
        message: &str,
        model: &dyn ModelClient,
    ) -> Result<Classification> {
        let system = "Classify the user's legal-assistant message. Respond with strict JSON: \
             {\"pipeline\": [one or more of ASSISTANT, CONTRACT_PARSER, LEGAL_RESEARCH, \
             COMPLIANCE_CHECKER, RISK_ASSESSOR, LEGAL_MEMO], \"query_type\": string}. No prose.";
        let response = model
            .generate(system, &[ModelMessage::user(message)], &[], &GenerateOptions {
                temperature: Some(0.0),
                response_mime: Some("application/json".to_string()),
                ..GenerateOptions::default()
            })
            .await?;

        #[derive(serde::Deserialize)]
        struct Raw {
            pipeline: Vec<String>,
            query_type: String,
        }

        let parsed: Raw = serde_json::from_str(&response.text()).unwrap_or(Raw {
            pipeline: vec!["ASSISTANT".to_string()],
            query_type: "fallback".to_string(),
        });

        let pipeline: Vec<AgentName> = parsed
            .pipeline
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        Ok(Classification {
            pipeline: if pipeline.is_empty() { vec![AgentName::Assistant] } else { pipeline },
            query_type: parsed.query_type,
        })
    }
}
