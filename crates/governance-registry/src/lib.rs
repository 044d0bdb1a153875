//! Authoritative action catalog (skill registry).
//!
//! Loaded once at startup from a declarative YAML artifact and immutable
//! afterwards. Everything the validator council needs to judge a proposal
//! structurally lives here: eligibility, preconditions, institutional
//! constraints, composite conflicts and the per-agent-type rule sets.

pub mod config;
pub mod definition;
pub mod predicate;
pub mod registry;
pub mod rules;

pub use config::{AgentTypeSpec, RegistryConfig, SkillSpec};
pub use definition::{InstitutionalConstraint, MagnitudeBounds, SkillDefinition};
pub use registry::{AgentTypeConfig, LookupError, SkillRegistry};
pub use rules::{IdentityRule, ThinkingRule};
