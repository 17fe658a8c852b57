//! Agent memory writes are best-effort: an analysis that succeeded is
//! never failed retroactively because the memory table was unavailable.
//! Failures are logged at warn and dropped.

use std::sync::Arc;

use shopsense_core::chrono::Utc;
use shopsense_core::domain::memory::{MemoryKind, MemoryRecord};
use shopsense_db::repositories::AgentMemoryRepository;
use tracing::warn;
use uuid::Uuid;

use crate::llm::LlmClient;

pub struct AgentMemory {
    agent_id: String,
    repository: Arc<dyn AgentMemoryRepository>,
    llm: Arc<dyn LlmClient>,
}

impl AgentMemory {
    pub fn new(
        agent_id: impl Into<String>,
        repository: Arc<dyn AgentMemoryRepository>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self { agent_id: agent_id.into(), repository, llm }
    }

    pub async fn observe(&self, key: Option<&str>, value: &str) {
        self.record(MemoryKind::Observation, key, value).await;
    }

    pub async fn reflect(&self, key: Option<&str>, value: &str) {
        self.record(MemoryKind::Reflection, key, value).await;
    }

    pub async fn record(&self, kind: MemoryKind, key: Option<&str>, value: &str) {
        let key = key.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());
        let embedding = self.llm.embed(value).await;
        let record = MemoryRecord {
            agent_id: self.agent_id.clone(),
            kind,
            key,
            value: value.to_string(),
            embedding,
            created_at: Utc::now(),
        };
        if let Err(error) = self.repository.store(record).await {
            warn!(agent_id = %self.agent_id, kind = kind.as_str(), %error, "dropping agent memory write");
        }
    }

    pub async fn recall(&self, kind: MemoryKind, limit: usize) -> Vec<MemoryRecord> {
        match self.repository.recall(&self.agent_id, kind, limit).await {
            Ok(memories) => memories,
            Err(error) => {
                warn!(agent_id = %self.agent_id, kind = kind.as_str(), %error, "memory recall failed");
                Vec::new()
            }
        }
    }
}
