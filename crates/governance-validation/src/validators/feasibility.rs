use governance_core::{InterventionReport, SkillProposal, ValidationResult};
use governance_registry::InstitutionalConstraint;

use crate::validator::{CouncilContext, Validator};

/// Second gate: preconditions hold in the current state, institutional
/// constraints are not exhausted and any proposed magnitude stays inside
/// the declared bounds.
pub struct FeasibilityValidator;

impl Validator for FeasibilityValidator {
    fn name(&self) -> &str {
        "feasibility"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        // Admissibility runs first; an unresolvable skill is its problem.
        let Ok(definition) = ctx
            .registry
            .resolve(&proposal.skill_name, &ctx.validation.agent_type)
        else {
            return ValidationResult::pass(self.name());
        };

        let mut result = ValidationResult::pass(self.name());

        let failed = definition.failed_preconditions(&ctx.validation.state);
        if !failed.is_empty() {
            result.push(
                InterventionReport::error(
                    "feasibility.preconditions",
                    &definition.name,
                    format!(
                        "precondition{} not met: {}",
                        if failed.len() == 1 { "" } else { "s" },
                        failed.join("; ")
                    ),
                )
                .with_feasible(ctx.feasible_skills()),
            );
        }

        if definition.has_constraint(InstitutionalConstraint::OnceOnly)
            && ctx.validation.took_skill_ever(&definition.name)
        {
            result.push(
                InterventionReport::error(
                    "feasibility.once-only",
                    &definition.name,
                    format!("'{}' can only be taken once", definition.name),
                )
                .with_feasible(ctx.feasible_skills()),
            );
        }

        if definition.has_constraint(InstitutionalConstraint::Annual)
            && ctx
                .validation
                .took_skill_in_year(&definition.name, ctx.validation.year)
        {
            result.push(
                InterventionReport::error(
                    "feasibility.annual",
                    &definition.name,
                    format!("'{}' was already taken this year", definition.name),
                )
                .with_feasible(ctx.feasible_skills()),
            );
        }

        if let (Some(magnitude), Some(bounds)) = (proposal.magnitude, definition.magnitude_bounds)
        {
            if !bounds.contains(magnitude) {
                result.push(
                    InterventionReport::error(
                        "feasibility.magnitude",
                        &definition.name,
                        format!(
                            "magnitude {} outside the allowed range [{}, {}]",
                            magnitude, bounds.min, bounds.max
                        ),
                    )
                    .with_feasible(ctx.feasible_skills()),
                );
            }
        }

        result
    }
}
