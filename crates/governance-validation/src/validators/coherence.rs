use governance_core::{InterventionReport, Severity, SkillProposal, ValidationResult};
use governance_registry::ThinkingRule;

use crate::validator::{CouncilContext, Validator};

/// Fourth gate: thinking rules over LLM-authored appraisal constructs.
///
/// A rule fires when every construct it names carries one of the listed
/// ratings and the proposed skill is in its block set. ERROR rules
/// block, WARNING rules record observations, INFO rules are kept out of
/// retry feedback entirely. Coherence-exempt skills (fallbacks) skip
/// this gate so a valid execution always exists.
pub struct CoherenceValidator;

impl CoherenceValidator {
    fn rule_fires(rule: &ThinkingRule, proposal: &SkillProposal) -> bool {
        rule.when.iter().all(|(construct, ratings)| {
            proposal
                .rating(construct)
                .map(|rating| ratings.contains(&rating))
                .unwrap_or(false)
        })
    }
}

impl Validator for CoherenceValidator {
    fn name(&self) -> &str {
        "coherence"
    }

    /// Blocking depends on LLM-generated constructs: a retry can change
    /// the appraisal, so the rule is not deterministic.
    fn deterministic(&self) -> bool {
        false
    }

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult {
        let mut result = ValidationResult::pass(self.name());

        let Ok(definition) = ctx
            .registry
            .resolve(&proposal.skill_name, &ctx.validation.agent_type)
        else {
            return result;
        };

        if definition.exempt_from_coherence {
            return result;
        }

        let Some(config) = ctx.registry.agent_type(&ctx.validation.agent_type) else {
            return result;
        };

        for rule in &config.thinking_rules {
            if !rule.blocks_skill(&definition.name) || !Self::rule_fires(rule, proposal) {
                continue;
            }

            let message = rule.message.clone().unwrap_or_else(|| {
                let constructs: Vec<String> = rule
                    .when
                    .iter()
                    .map(|(construct, _)| {
                        let rating = proposal
                            .rating(construct)
                            .map(|r| r.to_string())
                            .unwrap_or_default();
                        format!("{}={}", construct, rating)
                    })
                    .collect();
                format!(
                    "'{}' is inconsistent with the stated appraisal ({})",
                    definition.name,
                    constructs.join(", ")
                )
            });

            let mut report = InterventionReport {
                rule_id: format!("coherence.{}", rule.id),
                blocked_skill: definition.name.clone(),
                severity: rule.severity,
                message,
                suggestion: governance_core::Suggestion::None,
            };
            if rule.severity == Severity::Error {
                // Neutral enumeration only; directive feedback induces
                // mode collapse in small models.
                let feasible: Vec<String> = ctx
                    .feasible_skills()
                    .into_iter()
                    .filter(|name| name != &definition.name)
                    .collect();
                report = report.with_feasible(feasible);
            }
            result.push(report);
        }

        result
    }
}
