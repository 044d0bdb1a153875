use governance_core::{SkillProposal, ValidationContext, ValidationResult};
use governance_registry::{InstitutionalConstraint, SkillRegistry};

/// What a validator gets to see: the shared registry plus the merged
/// per-decision view.
pub struct CouncilContext<'a> {
    pub registry: &'a SkillRegistry,
    pub validation: &'a ValidationContext,
}

impl CouncilContext<'_> {
    /// Skills the agent could actually take right now: eligible,
    /// preconditions satisfied, institutional constraints not exhausted.
    /// This is the Tier B enumeration, sorted by name.
    pub fn feasible_skills(&self) -> Vec<String> {
        self.registry
            .eligible_for(&self.validation.agent_type)
            .iter()
            .filter(|def| def.preconditions_hold(&self.validation.state))
            .filter(|def| {
                !(def.has_constraint(InstitutionalConstraint::OnceOnly)
                    && self.validation.took_skill_ever(&def.name))
            })
            .filter(|def| {
                !(def.has_constraint(InstitutionalConstraint::Annual)
                    && self
                        .validation
                        .took_skill_in_year(&def.name, self.validation.year))
            })
            .map(|def| def.name.clone())
            .collect()
    }
}

/// One stage of the council pipeline.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    /// True when the blocking condition depends only on static agent
    /// state; retrying the same proposal cannot change the outcome.
    fn deterministic(&self) -> bool;

    fn validate(&self, proposal: &SkillProposal, ctx: &CouncilContext<'_>) -> ValidationResult;

    /// Notification that a decision landed (executed successfully).
    /// Stateful validators advance their per-agent counters here;
    /// retries within one decision never reach this.
    fn on_decision(&self, _agent_id: &str, _skill_name: &str) {}
}
