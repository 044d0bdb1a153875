//! Validator council: the ordered, short-circuit-on-error pipeline every
//! proposal must clear before execution.
//!
//! Validators are data-producing, never panicking and never `Err`-ing:
//! a blocked proposal is a [`ValidationResult`] with an ERROR report.
//! Each validator also declares whether its blocking condition depends
//! only on static agent state (deterministic) or on LLM-generated
//! constructs, which drives the broker's early-exit rule.
//!
//! [`ValidationResult`]: governance_core::ValidationResult

pub mod council;
pub mod validator;
pub mod validators;

pub use council::{PipelineOutcome, ValidatorCouncil};
pub use validator::{CouncilContext, Validator};
pub use validators::admissibility::AdmissibilityValidator;
pub use validators::coherence::CoherenceValidator;
pub use validators::domain::{DomainCategory, DomainCheck, DomainValidator};
pub use validators::effect_safety::EffectSafetyValidator;
pub use validators::feasibility::FeasibilityValidator;
pub use validators::identity::{IdentityCheck, IdentityValidator};
pub use validators::stateful::ConsecutiveLimitCheck;
