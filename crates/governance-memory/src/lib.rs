//! Human-centric memory engine.
//!
//! Each agent owns a bounded working buffer and an unbounded long-term
//! tier. Items carry an importance score that decays exponentially with
//! age; high-importance items are probabilistically consolidated into
//! long-term storage at ingestion. Retrieval is either recency-based
//! ("basic") or a salience-weighted ranking over freshness, decayed
//! importance, contextual boosters, query relevance and retroactive
//! interference.

pub mod config;
pub mod engine;
pub mod item;
pub mod store;
pub mod surprise;

pub use config::{MemoryConfig, RankingMode, RetrievalWeights};
pub use engine::{MemoryEngine, MemorySnapshot, ObservationMeta, RetrievalQuery};
pub use item::{MemoryItem, MemorySource};
pub use store::AgentMemoryStore;
pub use surprise::{CognitiveSystem, NoSurprise, SurprisePlugin};
