//! Governance middleware between LLM agents and agent-based simulations.
//!
//! Re-exports the whole pipeline: registry, adapter, validator council,
//! memory engine, context builder, reflection, audit and the broker that
//! orchestrates them.

pub use governance_adapter::{AdapterConfig, ModelAdapter, ParseOutcome, ParseStage, ParsedReply};
pub use governance_audit::{AttemptRecord, AuditWriter, DecisionRecord, RunSummary};
pub use governance_broker::{
    BrokerConfig, DEFAULT_PROMPT_TEMPLATE, SkillBrokerBuilder, SkillBrokerEngine, format_feedback,
    select_reports,
};
pub use governance_context::{
    AssembledContext, BoosterRule, ContextBuilder, ContextConfig, TemplateRenderer, VerbalBin,
};
pub use governance_core::{
    AgentProfile, AgentState, ApprovedSkill, AttrValue, DecisionOutcome, DecisionReport,
    DynamicSkillMap, ExecutionResult, GovernanceError, InterventionReport, LifecycleHooks,
    NoopHooks, OrdinalRating, ProposalError, RecentDecision, Result, Severity, SimulationEngine,
    SkillProposal, Suggestion, ValidationContext, ValidationResult,
};
pub use governance_llm::{LlmError, LlmInvoker, LlmReply, MockInvoker};
pub use governance_memory::{
    AgentMemoryStore, CognitiveSystem, MemoryConfig, MemoryEngine, MemoryItem, MemorySnapshot,
    MemorySource, NoSurprise, ObservationMeta, RankingMode, RetrievalQuery, RetrievalWeights,
    SurprisePlugin,
};
pub use governance_reflection::{
    ReflectionConfig, ReflectionEngine, ReflectionInsight, build_batch_prompt,
    parse_batch_response,
};
pub use governance_registry::{
    AgentTypeConfig, AgentTypeSpec, IdentityRule, InstitutionalConstraint, LookupError,
    MagnitudeBounds, RegistryConfig, SkillDefinition, SkillRegistry, SkillSpec, ThinkingRule,
};
pub use governance_validation::{
    AdmissibilityValidator, CoherenceValidator, ConsecutiveLimitCheck, CouncilContext,
    DomainCategory, DomainCheck, DomainValidator, EffectSafetyValidator, FeasibilityValidator,
    IdentityCheck, IdentityValidator, PipelineOutcome, Validator, ValidatorCouncil,
};
