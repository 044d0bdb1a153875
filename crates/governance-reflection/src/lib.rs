//! Reflection engine: periodic batch consolidation of episodic memories
//! into high-importance semantic insights.
//!
//! Prompt building and response parsing are pure functions; the engine
//! only sequences them around the LLM call and writes insights back as
//! `reflection`-sourced memories that survive subsequent decay.

pub mod engine;
pub mod prompt;

pub use engine::{ReflectionConfig, ReflectionEngine, ReflectionInsight};
pub use prompt::{build_batch_prompt, parse_batch_response};
