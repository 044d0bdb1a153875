use governance_core::{InterventionReport, SkillProposal, ValidationResult};

use crate::validator::{CouncilContext, Validator};

/// Sixth gate: the projected state changes must respect ownership.
/// Attributes under a protected prefix belong to institutional agents;
/// anyone else proposing a skill that writes them is blocked.
pub struct EffectSafetyValidator {
    protected_prefixes: Vec<String>,
}

impl EffectSafetyValidator {
    pub fn new(protected_prefixes: Vec<String>) -> Self {
        Self { protected_prefixes }
    }

    fn is_protected(&self, attribute: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| attribute.starts_with(prefix))
    }
}

impl Default for EffectSafetyValidator {
    fn default() -> Self {
        Self::new(vec!["institutional_".to_string()])
    }
}

impl Validator for EffectSafetyValidator {
    fn name(&self) -> &str {
        "effect-safety"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        let Ok(definition) = ctx
            .registry
            .resolve(&proposal.skill_name, &ctx.validation.agent_type)
        else {
            return ValidationResult::pass(self.name());
        };

        let institutional = ctx
            .registry
            .agent_type(&ctx.validation.agent_type)
            .map(|config| config.institutional)
            .unwrap_or(false);
        if institutional {
            return ValidationResult::pass(self.name());
        }

        let mut result = ValidationResult::pass(self.name());
        for attribute in definition.state_changes.keys() {
            if self.is_protected(attribute) {
                result.push(
                    InterventionReport::error(
                        "effect-safety.ownership",
                        &definition.name,
                        format!(
                            "'{}' writes institutional state '{}'",
                            definition.name, attribute
                        ),
                    )
                    .with_feasible(ctx.feasible_skills()),
                );
            }
        }
        result
    }
}
