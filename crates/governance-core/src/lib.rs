//! Core types and traits for the agent governance middleware

pub mod error;
pub mod execution;
pub mod proposal;
pub mod rating;
pub mod state;
pub mod traits;
pub mod validation;
pub mod validation_context;

pub use error::{GovernanceError, Result};
pub use execution::ExecutionResult;
pub use proposal::{
    ApprovedSkill, DecisionOutcome, DecisionReport, DynamicSkillMap, ProposalError, SkillProposal,
};
pub use rating::OrdinalRating;
pub use state::{AgentProfile, AgentState, AttrValue};
pub use traits::hooks::{LifecycleHooks, NoopHooks};
pub use traits::simulation::SimulationEngine;
pub use validation::{InterventionReport, Severity, Suggestion, ValidationResult};
pub use validation_context::{RecentDecision, ValidationContext};
