use governance_core::{SkillProposal, ValidationContext, ValidationResult};

use crate::validator::{CouncilContext, Validator};

/// Organizational tag for domain checks; purely for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCategory {
    Physical,
    Social,
    Semantic,
}

impl DomainCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainCategory::Physical => "physical",
            DomainCategory::Social => "social",
            DomainCategory::Semantic => "semantic",
        }
    }
}

/// A pluggable domain predicate.
pub trait DomainCheck: Send + Sync {
    fn rule_id(&self) -> &str;

    fn category(&self) -> DomainCategory;

    /// Whether the check's blocking condition depends only on static
    /// agent state.
    fn deterministic(&self) -> bool {
        true
    }

    fn check(&self, proposal: &SkillProposal, ctx: &ValidationContext) -> ValidationResult;

    /// Notification that a decision landed. Stateful checks advance
    /// their per-agent counters here.
    fn on_decision(&self, _agent_id: &str, _skill_name: &str) {}
}

/// Fifth gate: custom physical/social/semantic predicates supplied by
/// the domain.
#[derive(Default)]
pub struct DomainValidator {
    checks: Vec<Box<dyn DomainCheck>>,
}

impl DomainValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: Box<dyn DomainCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Validator for DomainValidator {
    fn name(&self) -> &str {
        "domain"
    }

    fn deterministic(&self) -> bool {
        self.checks.iter().all(|check| check.deterministic())
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        let mut merged = ValidationResult::pass(self.name());
        for check in &self.checks {
            let result = check.check(proposal, ctx.validation);
            tracing::debug!(
                rule = check.rule_id(),
                category = check.category().as_str(),
                valid = result.valid,
                "domain check"
            );
            for report in result
                .errors
                .into_iter()
                .chain(result.warnings)
                .chain(result.infos)
            {
                merged.push(report);
            }
        }
        merged
    }

    fn on_decision(&self, agent_id: &str, skill_name: &str) {
        for check in &self.checks {
            check.on_decision(agent_id, skill_name);
        }
    }
}
