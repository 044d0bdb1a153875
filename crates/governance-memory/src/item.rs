use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Where a memory came from. Source scales initial importance and is
/// preserved verbatim through checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    Personal,
    Neighbor,
    Community,
    Reflection,
    Abstract,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::Personal => "personal",
            MemorySource::Neighbor => "neighbor",
            MemorySource::Community => "community",
            MemorySource::Reflection => "reflection",
            MemorySource::Abstract => "abstract",
        }
    }
}

/// One episodic memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub agent_id: String,
    pub content: String,
    /// Initial importance I₀ ∈ [0,1]; decays with age at retrieval time.
    pub importance: f64,
    pub emotion: String,
    pub source: MemorySource,
    pub year: u32,
    pub tags: BTreeSet<String>,
    pub consolidated: bool,
    /// Monotonic creation counter, the stable retrieval tie-break.
    pub seq: u64,
}

impl MemoryItem {
    /// Decayed importance `I(t) = I₀·exp(-λ·age)` at the given year.
    pub fn decayed_importance(&self, now_year: u32, decay_rate: f64) -> f64 {
        self.importance * (-decay_rate * self.age(now_year)).exp()
    }

    pub fn age(&self, now_year: u32) -> f64 {
        now_year.saturating_sub(self.year) as f64
    }
}
