// ThinkingLogger (C9): an in-memory append buffer per turn, flushed to the
// Store in batches. Mirrors the teacher's event-emitter-then-flush pattern,
// specialized to structured ThinkingLog rows instead of SSE-facing events.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::ThinkingLog;
use crate::error::Result;
use crate::traits::Store;

pub struct ThinkingLogger {
    session_id: Uuid,
    turn_id: Uuid,
    turn_started: Instant,
    buffer: Mutex<Vec<ThinkingLog>>,
}

impl ThinkingLogger {
    pub fn new(session_id: Uuid, turn_id: Uuid) -> Self {
        Self {
            session_id,
            turn_id,
            turn_started: Instant::now(),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Appends one stage to the buffer. `sequence` is assigned as the
    /// buffer's current length + 1, keeping the contiguous 1..N invariant
    /// as long as every stage for this turn goes through this logger.
    pub async fn record(
        &self,
        agent_name: impl Into<String>,
        stage: crate::entities::ThinkingStage,
        payload: Value,
    ) {
        let mut buffer = self.buffer.lock().await;
        let sequence = buffer.len() as i64 + 1;
        buffer.push(ThinkingLog {
            id: Uuid::now_v7(),
            session_id: self.session_id,
            turn_id: self.turn_id,
            sequence,
            agent_name: agent_name.into(),
            stage,
            payload,
            duration_ms: self.turn_started.elapsed().as_millis() as i64,
            created_at: Utc::now(),
        });
    }

    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Flushes the buffer to the Store. Safe to call more than once; the
    /// second call flushes nothing. On crash before this runs the
    /// already-written prefix (from a prior flush) is what remains visible
    /// — acceptable because logs are advisory, per the specification.
    pub async fn flush(&self, store: &Arc<dyn Store>) -> Result<()> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return Ok(());
        }
        let logs = std::mem::take(&mut *buffer);
        store.append_thinking_logs(logs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ThinkingStage;
    use crate::memory::InMemoryStore;

    #[tokio::test]
    async fn sequence_is_contiguous_from_one() {
        let logger = ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7());
        logger.record("ASSISTANT", ThinkingStage::AgentStart, serde_json::json!({})).await;
        logger.record("ASSISTANT", ThinkingStage::AgentOutput, serde_json::json!({})).await;
        assert_eq!(logger.len().await, 2);
    }

    #[tokio::test]
    async fn flush_is_idempotent() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let logger = ThinkingLogger::new(Uuid::now_v7(), Uuid::now_v7());
        logger.record("ASSISTANT", ThinkingStage::Classify, serde_json::json!({})).await;
        logger.flush(&store).await.unwrap();
        logger.flush(&store).await.unwrap();
        assert_eq!(logger.len().await, 0);
    }
}
