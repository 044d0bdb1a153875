//! Skill broker engine.
//!
//! The orchestrator of the governance pipeline: assemble context, invoke
//! the model, parse, validate, retry with structured feedback, fall back
//! when retries are exhausted, execute, remember, audit. Every state
//! mutation in the simulation traces back to a proposal that cleared the
//! council or to the domain's declared fallback skill.

pub mod config;
pub mod engine;
pub mod feedback;

pub use config::{BrokerConfig, DEFAULT_PROMPT_TEMPLATE};
pub use engine::{SkillBrokerBuilder, SkillBrokerEngine};
pub use feedback::{format_feedback, select_reports};
