use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Experience,
    Observation,
    Plan,
    Reflection,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::Observation => "observation",
            Self::Plan => "plan",
            Self::Reflection => "reflection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "experience" => Some(Self::Experience),
            "observation" => Some(Self::Observation),
            "plan" => Some(Self::Plan),
            "reflection" => Some(Self::Reflection),
            _ => None,
        }
    }
}

/// One stored agent memory, with the embedding computed at write time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub agent_id: String,
    pub kind: MemoryKind,
    pub key: String,
    pub value: String,
    pub embedding: Vec<f64>,
    pub created_at: DateTime<Utc>,
}
