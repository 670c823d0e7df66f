// ContextBuilder (C4): assembles the bounded prompt handed to the model for
// one agent turn — system instructions, a trimmed history window, an
// optional contract digest, and the current user message, last.

use chrono::Utc;

use crate::catalog::AgentDefinition;
use crate::entities::{Clause, Contract, Message, MessageRole};
use crate::traits::ModelMessage;

const CONTRACT_DIGEST_MAX_CHARS: usize = 2_000;
const TOP_RISK_CLAUSES: usize = 5;

pub struct ContextBuilder {
    pub history_window_pairs: usize,
}

impl ContextBuilder {
    pub fn new(history_window_pairs: usize) -> Self {
        Self { history_window_pairs }
    }

    /// Builds the system block: agent instructions plus a runtime preamble
    /// carrying the current UTC date, so the model never has to guess "today".
    pub fn system_block(&self, agent: &AgentDefinition) -> String {
        format!(
            "{instructions}\n\nCurrent date (UTC): {date}",
            instructions = agent.system_instructions,
            date = Utc::now().format("%Y-%m-%d"),
        )
    }

    /// The trimmed history window: the most recent `history_window_pairs`
    /// user/assistant pairs, oldest-first, excluding the current turn's user
    /// message (appended separately by the caller).
    pub fn history_messages(&self, history: &[Message]) -> Vec<ModelMessage> {
        let max_messages = self.history_window_pairs * 2;
        let trimmed = if history.len() > max_messages {
            &history[history.len() - max_messages..]
        } else {
            history
        };
        trimmed
            .iter()
            .map(|m| match m.role {
                MessageRole::User => ModelMessage::user(m.content.clone()),
                MessageRole::Assistant => ModelMessage::assistant_with_tools(m.content.clone(), Vec::new()),
            })
            .collect()
    }

    /// A compact, token-bounded digest of the active contract: title, type,
    /// normalized party names, status, and its highest-risk clauses. Parties
    /// are read via `.name` — never the record's `Debug` form — so the
    /// digest can't degrade into a stringified struct dump.
    pub fn contract_digest(&self, contract: &Contract, clauses: &[Clause]) -> String {
        let parties = contract
            .parties
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut ranked: Vec<&Clause> = clauses.iter().collect();
        ranked.sort_by(|a, b| {
            b.risk_score
                .unwrap_or(0.0)
                .partial_cmp(&a.risk_score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut digest = format!(
            "Contract: {title}\nType: {contract_type}\nParties: {parties}\nStatus: {status:?}\n",
            title = contract.title,
            contract_type = contract.contract_type.as_deref().unwrap_or("unspecified"),
            status = contract.status,
        );

        for clause in ranked.into_iter().take(TOP_RISK_CLAUSES) {
            digest.push_str(&format!(
                "- [{type_}] risk={risk:.2}: {text}\n",
                type_ = clause.clause_type,
                risk = clause.risk_score.unwrap_or(0.0),
                text = clause.text,
            ));
        }

        truncate_to_chars(&digest, CONTRACT_DIGEST_MAX_CHARS)
    }

    /// Assembles the final message list: history, optional contract digest,
    /// this turn's running context buffer (every prior agent's output in
    /// pipeline order), then the current user message last. The buffer is
    /// what lets an agent with no tool access of its own (e.g. `LEGAL_MEMO`)
    /// see what earlier agents in the same pipeline found.
    pub fn build(
        &self,
        history: &[Message],
        contract_digest: Option<String>,
        prior_agent_outputs: &[(String, String)],
        current_user_message: &str,
    ) -> Vec<ModelMessage> {
        let mut messages = self.history_messages(history);
        if let Some(digest) = contract_digest {
            messages.push(ModelMessage::user(format!("[Active contract context]\n{digest}")));
        }
        for (agent_name, content) in prior_agent_outputs {
            messages.push(ModelMessage::user(format!("[{agent_name} findings this turn]\n{content}")));
        }
        messages.push(ModelMessage::user(current_user_message));
        messages
    }
}

fn truncate_to_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}
