use governance_core::{InterventionReport, SkillProposal, ValidationResult};
use governance_registry::LookupError;

use crate::validator::{CouncilContext, Validator};

/// First gate: the proposed skill must resolve in the registry and be
/// available to the agent's type.
pub struct AdmissibilityValidator;

impl Validator for AdmissibilityValidator {
    fn name(&self) -> &str {
        "admissibility"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        match ctx
            .registry
            .resolve(&proposal.skill_name, &ctx.validation.agent_type)
        {
            Ok(_) => ValidationResult::pass(self.name()),
            Err(LookupError::UnknownSkill(name)) => ValidationResult::fail(
                self.name(),
                InterventionReport::error(
                    "admissibility.unknown-skill",
                    &proposal.skill_name,
                    format!("'{}' is not a known skill", name),
                )
                .with_feasible(ctx.feasible_skills()),
            ),
            Err(LookupError::NotEligible { skill, agent_type }) => ValidationResult::fail(
                self.name(),
                InterventionReport::error(
                    "admissibility.ineligible",
                    &proposal.skill_name,
                    format!("'{}' is not available to agent type '{}'", skill, agent_type),
                )
                .with_feasible(ctx.feasible_skills()),
            ),
        }
    }
}
