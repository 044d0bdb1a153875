use governance_core::{
    InterventionReport, Severity, SkillProposal, ValidationContext, ValidationResult,
};
use governance_registry::predicate;

use crate::validator::{CouncilContext, Validator};

/// Programmatic identity check for constraints YAML predicates cannot
/// express (arithmetic over several attributes, lookups, etc.).
pub trait IdentityCheck: Send + Sync {
    fn id(&self) -> &str;

    /// `Some(report)` blocks or annotates the proposal; `None` passes.
    fn check(&self, proposal: &SkillProposal, ctx: &ValidationContext)
    -> Option<InterventionReport>;
}

/// Third gate: resource-based personal constraints. Declarative rules
/// come from the agent-type block of the registry; programmatic checks
/// plug in beside them.
#[derive(Default)]
pub struct IdentityValidator {
    plugins: Vec<Box<dyn IdentityCheck>>,
}

impl IdentityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: Box<dyn IdentityCheck>) -> Self {
        self.plugins.push(check);
        self
    }
}

impl Validator for IdentityValidator {
    fn name(&self) -> &str {
        "identity"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        let mut result = ValidationResult::pass(self.name());

        let Ok(definition) = ctx
            .registry
            .resolve(&proposal.skill_name, &ctx.validation.agent_type)
        else {
            return result;
        };

        if let Some(config) = ctx.registry.agent_type(&ctx.validation.agent_type) {
            for rule in &config.identity_rules {
                if !rule.applies_to_skill(&definition.name) {
                    continue;
                }
                // Rules were compile-checked at registry load.
                let Ok(node) = predicate::compile(&rule.require) else {
                    continue;
                };
                if predicate::evaluate(&node, &ctx.validation.state) {
                    continue;
                }
                let mut report = InterventionReport {
                    rule_id: format!("identity.{}", rule.id),
                    blocked_skill: definition.name.clone(),
                    severity: rule.severity,
                    message: rule.message.clone(),
                    suggestion: governance_core::Suggestion::None,
                };
                if rule.severity == Severity::Error {
                    report = report.with_feasible(ctx.feasible_skills());
                }
                result.push(report);
            }
        }

        for plugin in &self.plugins {
            if let Some(mut report) = plugin.check(proposal, ctx.validation) {
                if report.severity == Severity::Error
                    && report.suggestion == governance_core::Suggestion::None
                {
                    report = report.with_feasible(ctx.feasible_skills());
                }
                result.push(report);
            }
        }

        result
    }
}
