// Postgres-backed `Store` (C2). Query style mirrors the teacher's
// repository layer: `query_as`/`bind`/`fetch_one`/`fetch_optional`/
// `fetch_all`, and the `COALESCE((SELECT MAX(sequence)+1 FROM ... WHERE
// ...), 1)` pattern for assigning a per-parent sequence number atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legal_core::{
    Citation, Clause, ComplianceRule, ComplianceStatus, Contract, ContractStatus, GeneratedDocument,
    GeneratedDocumentKind, Message, MessageRole, OrchestratorError, Party, Result, RuleSeverity, Session,
    ThinkingLog, ThinkingStage, ToolCallSummary,
};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_url(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn internal(e: sqlx::Error) -> OrchestratorError {
    OrchestratorError::Internal(anyhow::anyhow!(e))
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    title: Option<String>,
    active_contract_id: Option<Uuid>,
    message_count: i64,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            title: row.title,
            active_contract_id: row.active_contract_id,
            message_count: row.message_count,
        }
    }
}

fn role_to_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn role_from_str(role: &str) -> Result<MessageRole> {
    match role {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown message role in storage: {other}"))),
    }
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> Result<Message> {
    let role: String = row.try_get("role").map_err(internal)?;
    let citations: serde_json::Value = row.try_get("citations").map_err(internal)?;
    let tool_calls_summary: serde_json::Value = row.try_get("tool_calls_summary").map_err(internal)?;
    Ok(Message {
        id: row.try_get("id").map_err(internal)?,
        session_id: row.try_get("session_id").map_err(internal)?,
        role: role_from_str(&role)?,
        content: row.try_get("content").map_err(internal)?,
        agent_name: row.try_get("agent_name").map_err(internal)?,
        citations: serde_json::from_value::<Vec<Citation>>(citations).map_err(|e| OrchestratorError::Internal(e.into()))?,
        tool_calls_summary: serde_json::from_value::<Vec<ToolCallSummary>>(tool_calls_summary)
            .map_err(|e| OrchestratorError::Internal(e.into()))?,
        created_at: row.try_get("created_at").map_err(internal)?,
    })
}

fn contract_status_to_str(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Uploaded => "uploaded",
        ContractStatus::Parsing => "parsing",
        ContractStatus::Ready => "ready",
        ContractStatus::Failed => "failed",
    }
}

fn contract_status_from_str(s: &str) -> Result<ContractStatus> {
    match s {
        "uploaded" => Ok(ContractStatus::Uploaded),
        "parsing" => Ok(ContractStatus::Parsing),
        "ready" => Ok(ContractStatus::Ready),
        "failed" => Ok(ContractStatus::Failed),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown contract status in storage: {other}"))),
    }
}

fn compliance_status_to_str(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Unknown => "unknown",
        ComplianceStatus::Compliant => "compliant",
        ComplianceStatus::Partial => "partial",
        ComplianceStatus::NonCompliant => "non_compliant",
    }
}

fn compliance_status_from_str(s: &str) -> Result<ComplianceStatus> {
    match s {
        "unknown" => Ok(ComplianceStatus::Unknown),
        "compliant" => Ok(ComplianceStatus::Compliant),
        "partial" => Ok(ComplianceStatus::Partial),
        "non_compliant" => Ok(ComplianceStatus::NonCompliant),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown compliance status in storage: {other}"))),
    }
}

fn contract_from_row(row: &sqlx::postgres::PgRow) -> Result<Contract> {
    let status: String = row.try_get("status").map_err(internal)?;
    let compliance_status: String = row.try_get("compliance_status").map_err(internal)?;
    let parties: serde_json::Value = row.try_get("parties").map_err(internal)?;
    Ok(Contract {
        id: row.try_get("id").map_err(internal)?,
        title: row.try_get("title").map_err(internal)?,
        contract_type: row.try_get("contract_type").map_err(internal)?,
        parties: serde_json::from_value::<Vec<Party>>(parties).map_err(|e| OrchestratorError::Internal(e.into()))?,
        uploaded_at: row.try_get("uploaded_at").map_err(internal)?,
        file_uri: row.try_get("file_uri").map_err(internal)?,
        status: contract_status_from_str(&status)?,
        overall_risk_score: row.try_get("overall_risk_score").map_err(internal)?,
        compliance_status: compliance_status_from_str(&compliance_status)?,
    })
}

fn clause_from_row(row: &sqlx::postgres::PgRow) -> Result<Clause> {
    Ok(Clause {
        id: row.try_get("id").map_err(internal)?,
        contract_id: row.try_get("contract_id").map_err(internal)?,
        index: row.try_get("index").map_err(internal)?,
        clause_type: row.try_get("type").map_err(internal)?,
        text: row.try_get("text").map_err(internal)?,
        risk_score: row.try_get("risk_score").map_err(internal)?,
        notes: row.try_get("notes").map_err(internal)?,
    })
}

fn stage_to_str(stage: ThinkingStage) -> &'static str {
    match stage {
        ThinkingStage::Classify => "classify",
        ThinkingStage::AgentStart => "agent_start",
        ThinkingStage::ToolCall => "tool_call",
        ThinkingStage::ToolResult => "tool_result",
        ThinkingStage::AgentOutput => "agent_output",
        ThinkingStage::Error => "error",
    }
}

fn stage_from_str(s: &str) -> Result<ThinkingStage> {
    match s {
        "classify" => Ok(ThinkingStage::Classify),
        "agent_start" => Ok(ThinkingStage::AgentStart),
        "tool_call" => Ok(ThinkingStage::ToolCall),
        "tool_result" => Ok(ThinkingStage::ToolResult),
        "agent_output" => Ok(ThinkingStage::AgentOutput),
        "error" => Ok(ThinkingStage::Error),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown thinking stage in storage: {other}"))),
    }
}

fn thinking_log_from_row(row: &sqlx::postgres::PgRow) -> Result<ThinkingLog> {
    let stage: String = row.try_get("stage").map_err(internal)?;
    Ok(ThinkingLog {
        id: row.try_get("id").map_err(internal)?,
        session_id: row.try_get("session_id").map_err(internal)?,
        turn_id: row.try_get("turn_id").map_err(internal)?,
        sequence: row.try_get("sequence").map_err(internal)?,
        agent_name: row.try_get("agent_name").map_err(internal)?,
        stage: stage_from_str(&stage)?,
        payload: row.try_get("payload").map_err(internal)?,
        duration_ms: row.try_get("duration_ms").map_err(internal)?,
        created_at: row.try_get("created_at").map_err(internal)?,
    })
}

fn document_kind_to_str(kind: GeneratedDocumentKind) -> &'static str {
    match kind {
        GeneratedDocumentKind::Memo => "memo",
        GeneratedDocumentKind::Summary => "summary",
        GeneratedDocumentKind::ComplianceReport => "compliance_report",
    }
}

fn document_kind_from_str(s: &str) -> Result<GeneratedDocumentKind> {
    match s {
        "memo" => Ok(GeneratedDocumentKind::Memo),
        "summary" => Ok(GeneratedDocumentKind::Summary),
        "compliance_report" => Ok(GeneratedDocumentKind::ComplianceReport),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown document kind in storage: {other}"))),
    }
}

fn severity_to_str(severity: RuleSeverity) -> &'static str {
    match severity {
        RuleSeverity::Low => "low",
        RuleSeverity::Medium => "medium",
        RuleSeverity::High => "high",
        RuleSeverity::Critical => "critical",
    }
}

fn severity_from_str(s: &str) -> Result<RuleSeverity> {
    match s {
        "low" => Ok(RuleSeverity::Low),
        "medium" => Ok(RuleSeverity::Medium),
        "high" => Ok(RuleSeverity::High),
        "critical" => Ok(RuleSeverity::Critical),
        other => Err(OrchestratorError::Internal(anyhow::anyhow!("unknown rule severity in storage: {other}"))),
    }
}

#[async_trait]
impl legal_core::Store for Database {
    async fn create_session(&self, session: Session) -> Result<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, created_at, updated_at, title, active_contract_id, message_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at, updated_at, title, active_contract_id, message_count
            "#,
        )
        .bind(session.id)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(&session.title)
        .bind(session.active_contract_id)
        .bind(session.message_count)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;

        Ok(row.into())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, created_at, updated_at, title, active_contract_id, message_count FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        Ok(row.map(Into::into))
    }

    async fn set_active_contract(&self, session_id: Uuid, contract_id: Option<Uuid>) -> Result<()> {
        let result = sqlx::query("UPDATE sessions SET active_contract_id = $2, updated_at = now() WHERE id = $1")
            .bind(session_id)
            .bind(contract_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::invalid_request("unknown session_id"));
        }
        Ok(())
    }

    async fn create_message(&self, message: Message) -> Result<Message> {
        let citations = serde_json::to_value(&message.citations).map_err(|e| OrchestratorError::Internal(e.into()))?;
        let tool_calls_summary =
            serde_json::to_value(&message.tool_calls_summary).map_err(|e| OrchestratorError::Internal(e.into()))?;

        let row = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO messages (id, session_id, sequence, role, content, agent_name, citations, tool_calls_summary, created_at)
                VALUES ($1, $2, COALESCE((SELECT MAX(sequence) + 1 FROM messages WHERE session_id = $2), 1), $3, $4, $5, $6, $7, $8)
                RETURNING id, session_id, role, content, agent_name, citations, tool_calls_summary, created_at
            ),
            bumped AS (
                UPDATE sessions SET message_count = message_count + 1, updated_at = now() WHERE id = $2
            )
            SELECT * FROM inserted
            "#,
        )
        .bind(message.id)
        .bind(message.session_id)
        .bind(role_to_str(message.role))
        .bind(&message.content)
        .bind(&message.agent_name)
        .bind(citations)
        .bind(tool_calls_summary)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;

        message_from_row(&row)
    }

    async fn list_messages(&self, session_id: Uuid, limit: usize, before: Option<DateTime<Utc>>) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, agent_name, citations, tool_calls_summary, created_at
            FROM messages
            WHERE session_id = $1 AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY sequence DESC
            LIMIT $3
            "#,
        )
        .bind(session_id)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        let mut messages = rows.iter().map(message_from_row).collect::<Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, contract_type, parties, uploaded_at, file_uri, status, overall_risk_score, compliance_status
            FROM contracts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        row.as_ref().map(contract_from_row).transpose()
    }

    async fn search_contracts(&self, query: &str) -> Result<Vec<Contract>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, contract_type, parties, uploaded_at, file_uri, status, overall_risk_score, compliance_status
            FROM contracts WHERE title ILIKE '%' || $1 || '%'
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        rows.iter().map(contract_from_row).collect()
    }

    async fn save_contract(&self, contract: Contract) -> Result<Contract> {
        let parties = serde_json::to_value(&contract.parties).map_err(|e| OrchestratorError::Internal(e.into()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO contracts (id, title, contract_type, parties, uploaded_at, file_uri, status, overall_risk_score, compliance_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                contract_type = EXCLUDED.contract_type,
                parties = EXCLUDED.parties,
                status = EXCLUDED.status,
                overall_risk_score = EXCLUDED.overall_risk_score,
                compliance_status = EXCLUDED.compliance_status
            RETURNING id, title, contract_type, parties, uploaded_at, file_uri, status, overall_risk_score, compliance_status
            "#,
        )
        .bind(contract.id)
        .bind(&contract.title)
        .bind(&contract.contract_type)
        .bind(parties)
        .bind(contract.uploaded_at)
        .bind(&contract.file_uri)
        .bind(contract_status_to_str(contract.status))
        .bind(contract.overall_risk_score)
        .bind(compliance_status_to_str(contract.compliance_status))
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;

        contract_from_row(&row)
    }

    async fn list_clauses(&self, contract_id: Uuid) -> Result<Vec<Clause>> {
        let rows = sqlx::query(
            "SELECT id, contract_id, index, type, text, risk_score, notes FROM clauses WHERE contract_id = $1 ORDER BY index",
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        rows.iter().map(clause_from_row).collect()
    }

    async fn save_clauses(&self, contract_id: Uuid, clauses: Vec<Clause>) -> Result<Vec<Clause>> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        sqlx::query("DELETE FROM clauses WHERE contract_id = $1")
            .bind(contract_id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        let mut saved = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let row = sqlx::query(
                r#"
                INSERT INTO clauses (id, contract_id, index, type, text, risk_score, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, contract_id, index, type, text, risk_score, notes
                "#,
            )
            .bind(clause.id)
            .bind(contract_id)
            .bind(clause.index)
            .bind(&clause.clause_type)
            .bind(&clause.text)
            .bind(clause.risk_score)
            .bind(&clause.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(internal)?;

            saved.push(clause_from_row(&row)?);
        }

        tx.commit().await.map_err(internal)?;
        Ok(saved)
    }

    async fn append_thinking_logs(&self, logs: Vec<ThinkingLog>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        for log in logs {
            sqlx::query(
                r#"
                INSERT INTO thinking_logs (id, session_id, turn_id, sequence, agent_name, stage, payload, duration_ms, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(log.id)
            .bind(log.session_id)
            .bind(log.turn_id)
            .bind(log.sequence)
            .bind(&log.agent_name)
            .bind(stage_to_str(log.stage))
            .bind(&log.payload)
            .bind(log.duration_ms)
            .bind(log.created_at)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        }
        tx.commit().await.map_err(internal)?;
        Ok(())
    }

    async fn list_thinking_logs(&self, session_id: Uuid, turn_id: Option<Uuid>) -> Result<Vec<ThinkingLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, turn_id, sequence, agent_name, stage, payload, duration_ms, created_at
            FROM thinking_logs
            WHERE session_id = $1 AND ($2::uuid IS NULL OR turn_id = $2)
            ORDER BY turn_id, sequence
            "#,
        )
        .bind(session_id)
        .bind(turn_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        rows.iter().map(thinking_log_from_row).collect()
    }

    async fn save_generated_document(&self, document: GeneratedDocument) -> Result<GeneratedDocument> {
        let row = sqlx::query(
            r#"
            INSERT INTO generated_documents (id, session_id, kind, file_uri, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, session_id, kind, file_uri, created_at
            "#,
        )
        .bind(document.id)
        .bind(document.session_id)
        .bind(document_kind_to_str(document.kind))
        .bind(&document.file_uri)
        .bind(document.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;

        let kind: String = row.try_get("kind").map_err(internal)?;
        Ok(GeneratedDocument {
            id: row.try_get("id").map_err(internal)?,
            session_id: row.try_get("session_id").map_err(internal)?,
            kind: document_kind_from_str(&kind)?,
            file_uri: row.try_get("file_uri").map_err(internal)?,
            created_at: row.try_get("created_at").map_err(internal)?,
        })
    }

    async fn list_documents(&self, session_id: Uuid) -> Result<Vec<GeneratedDocument>> {
        let rows = sqlx::query("SELECT id, session_id, kind, file_uri, created_at FROM generated_documents WHERE session_id = $1 ORDER BY created_at")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;

        rows.into_iter()
            .map(|row| {
                let kind: String = row.try_get("kind").map_err(internal)?;
                Ok(GeneratedDocument {
                    id: row.try_get("id").map_err(internal)?,
                    session_id: row.try_get("session_id").map_err(internal)?,
                    kind: document_kind_from_str(&kind)?,
                    file_uri: row.try_get("file_uri").map_err(internal)?,
                    created_at: row.try_get("created_at").map_err(internal)?,
                })
            })
            .collect()
    }

    async fn list_compliance_rules(&self, regulation: &str) -> Result<Vec<ComplianceRule>> {
        let rows = sqlx::query("SELECT regulation, rule_id, text, category, severity FROM compliance_rules WHERE regulation = $1")
            .bind(regulation)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;

        rows.into_iter()
            .map(|row| {
                let severity: String = row.try_get("severity").map_err(internal)?;
                Ok(ComplianceRule {
                    regulation: row.try_get("regulation").map_err(internal)?,
                    rule_id: row.try_get("rule_id").map_err(internal)?,
                    text: row.try_get("text").map_err(internal)?,
                    category: row.try_get("category").map_err(internal)?,
                    severity: severity_from_str(&severity)?,
                })
            })
            .collect()
    }
}
