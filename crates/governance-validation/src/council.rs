use std::collections::BTreeSet;
use std::sync::Arc;

use governance_core::{
    InterventionReport, SkillProposal, ValidationContext, ValidationResult,
};
use governance_registry::SkillRegistry;

use crate::validator::{CouncilContext, Validator};
use crate::validators::admissibility::AdmissibilityValidator;
use crate::validators::coherence::CoherenceValidator;
use crate::validators::domain::{DomainCheck, DomainValidator};
use crate::validators::effect_safety::EffectSafetyValidator;
use crate::validators::feasibility::FeasibilityValidator;
use crate::validators::identity::{IdentityCheck, IdentityValidator};

/// What one full pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub results: Vec<ValidationResult>,
    pub passed: bool,
    /// `(rule_id, deterministic)` for every blocking report, in pipeline
    /// order.
    blocking: Vec<(String, bool)>,
}

impl PipelineOutcome {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            passed: true,
            blocking: Vec::new(),
        }
    }

    pub fn blocking_rule_ids(&self) -> BTreeSet<String> {
        self.blocking.iter().map(|(id, _)| id.clone()).collect()
    }

    /// True iff every blocking rule is static: retrying the identical
    /// proposal cannot succeed.
    pub fn all_blocking_deterministic(&self) -> bool {
        !self.blocking.is_empty() && self.blocking.iter().all(|(_, det)| *det)
    }

    pub fn error_reports(&self) -> Vec<&InterventionReport> {
        self.results.iter().flat_map(|r| r.errors.iter()).collect()
    }

    pub fn warning_reports(&self) -> Vec<&InterventionReport> {
        self.results.iter().flat_map(|r| r.warnings.iter()).collect()
    }
}

/// Ordered, short-circuit-on-error validator pipeline.
pub struct ValidatorCouncil {
    registry: Arc<SkillRegistry>,
    validators: Vec<Box<dyn Validator>>,
    multi_skill: bool,
}

/// Assembles the council in the fixed stage order, with the pluggable
/// slots filled in.
pub struct CouncilBuilder {
    registry: Arc<SkillRegistry>,
    identity_checks: Vec<Box<dyn IdentityCheck>>,
    domain_checks: Vec<Box<dyn DomainCheck>>,
    protected_prefixes: Vec<String>,
    multi_skill: bool,
}

impl CouncilBuilder {
    pub fn identity_check(mut self, check: Box<dyn IdentityCheck>) -> Self {
        self.identity_checks.push(check);
        self
    }

    pub fn domain_check(mut self, check: Box<dyn DomainCheck>) -> Self {
        self.domain_checks.push(check);
        self
    }

    pub fn protected_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.protected_prefixes.push(prefix.into());
        self
    }

    pub fn multi_skill(mut self, enabled: bool) -> Self {
        self.multi_skill = enabled;
        self
    }

    pub fn build(self) -> ValidatorCouncil {
        let mut identity = IdentityValidator::new();
        for check in self.identity_checks {
            identity = identity.with_check(check);
        }
        let mut domain = DomainValidator::new();
        for check in self.domain_checks {
            domain = domain.with_check(check);
        }

        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(AdmissibilityValidator),
            Box::new(FeasibilityValidator),
            Box::new(identity),
            Box::new(CoherenceValidator),
            Box::new(domain),
            Box::new(EffectSafetyValidator::new(self.protected_prefixes)),
        ];

        ValidatorCouncil {
            registry: self.registry,
            validators,
            multi_skill: self.multi_skill,
        }
    }
}

impl ValidatorCouncil {
    pub fn builder(registry: Arc<SkillRegistry>) -> CouncilBuilder {
        CouncilBuilder {
            registry,
            identity_checks: Vec::new(),
            domain_checks: Vec::new(),
            protected_prefixes: vec!["institutional_".to_string()],
            multi_skill: false,
        }
    }

    /// The default council with no domain plug-ins.
    pub fn standard(registry: Arc<SkillRegistry>) -> Self {
        Self::builder(registry).build()
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn multi_skill_enabled(&self) -> bool {
        self.multi_skill
    }

    /// Report a landed (successfully executed) decision to every
    /// validator so stateful ones can advance their per-agent counters.
    pub fn record_decision(&self, agent_id: &str, skill_name: &str) {
        for validator in &self.validators {
            validator.on_decision(agent_id, skill_name);
        }
    }

    /// Run the full pipeline against a proposal. Validators execute in
    /// the fixed order and the run stops at the first blocking result;
    /// warnings and infos accumulate along the way.
    pub fn run_pipeline(
        &self,
        proposal: &SkillProposal,
        validation: &ValidationContext,
    ) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::new();
        self.run_stages(proposal, validation, &mut outcome);

        if outcome.passed && self.multi_skill {
            if let Some(secondary) = proposal.secondary_skill_name.clone() {
                self.run_composite_phase(proposal, &secondary, validation, &mut outcome);
            }
        }

        outcome
    }

    fn run_stages(
        &self,
        proposal: &SkillProposal,
        validation: &ValidationContext,
        outcome: &mut PipelineOutcome,
    ) {
        let ctx = CouncilContext {
            registry: &self.registry,
            validation,
        };

        for validator in &self.validators {
            let result = validator.validate(proposal, &ctx);
            let blocked = !result.valid;
            for report in &result.errors {
                outcome
                    .blocking
                    .push((report.rule_id.clone(), validator.deterministic()));
            }
            tracing::debug!(
                validator = validator.name(),
                valid = result.valid,
                "pipeline stage"
            );
            outcome.results.push(result);
            if blocked {
                outcome.passed = false;
                break;
            }
        }
    }

    /// Phase run only when multi-skill is enabled and a secondary is
    /// present: the secondary goes through the same stages as if it were
    /// primary, then the pair is checked for declared conflicts.
    fn run_composite_phase(
        &self,
        proposal: &SkillProposal,
        secondary: &str,
        validation: &ValidationContext,
        outcome: &mut PipelineOutcome,
    ) {
        let mut secondary_proposal = match SkillProposal::new(secondary) {
            Ok(p) => p,
            Err(_) => return,
        };
        secondary_proposal.reasoning = proposal.reasoning.clone();

        self.run_stages(&secondary_proposal, validation, outcome);
        if !outcome.passed {
            return;
        }

        if self
            .registry
            .check_composite_conflicts(&proposal.skill_name, secondary)
        {
            let report = InterventionReport::error(
                "composite.conflict",
                secondary,
                format!(
                    "'{}' cannot be combined with '{}'",
                    secondary, proposal.skill_name
                ),
            );
            outcome.blocking.push((report.rule_id.clone(), true));
            outcome.results.push(ValidationResult::fail("composite", report));
            outcome.passed = false;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use governance_core::{AgentState, AttrValue, RecentDecision};
    use serde_json::json;
    use std::collections::HashMap;

    const FIXTURE_YAML: &str = r#"
skills:
  - name: do_nothing
    agent_types: [household]
  - name: wait_and_see
    agent_types: [household]
    exempt_from_coherence: true
  - name: elevate_house
    aliases: [elevation]
    agent_types: [household]
    preconditions:
      - "elevated == false"
    state_changes:
      elevated: true
    institutional_constraints: [once_only]
    magnitude_bounds: { min: 0.5, max: 3.0 }
    composite_conflicts: [relocate]
  - name: buy_insurance
    agent_types: [household]
    institutional_constraints: [annual]
    state_changes:
      insured: true
  - name: relocate
    agent_types: [household]
    state_changes:
      relocated: true
agent_types:
  household:
    fallback_skill: do_nothing
    identity_rules:
      - id: affordability
        applies_to: [elevate_house]
        require: "savings >= 30000"
        message: "insufficient savings for elevation"
    thinking_rules:
      - id: threat-calls-for-action
        when:
          tp: [H, VH]
          cp: [H, VH]
        block: [do_nothing, wait_and_see]
        severity: ERROR
"#;

    pub(crate) fn registry() -> SkillRegistry {
        SkillRegistry::from_yaml_str(FIXTURE_YAML).unwrap()
    }

    pub(crate) fn registry_with_warning_rule() -> SkillRegistry {
        SkillRegistry::from_yaml_str(&FIXTURE_YAML.replace("severity: ERROR", "severity: WARNING"))
            .unwrap()
    }

    pub(crate) fn institutional_registry() -> SkillRegistry {
        SkillRegistry::from_yaml_str(
            r#"
skills:
  - name: do_nothing
    agent_types: [household, district]
  - name: elevate_house
    agent_types: [household]
    state_changes:
      elevated: true
  - name: set_subsidy
    agent_types: [household]
    state_changes:
      institutional_subsidy_rate: 0.2
  - name: set_policy
    agent_types: [district]
    state_changes:
      institutional_policy: "strict"
agent_types:
  household:
    fallback_skill: do_nothing
  district:
    fallback_skill: do_nothing
    institutional: true
"#,
        )
        .unwrap()
    }

    /// Household agent in year 5, solvent and not yet elevated.
    pub(crate) fn context(recent: &[(u32, &str)]) -> ValidationContext {
        context_with(recent, |_| {})
    }

    pub(crate) fn context_with(
        recent: &[(u32, &str)],
        adjust: impl FnOnce(&mut AgentState),
    ) -> ValidationContext {
        let mut state = AgentState::new();
        state.set("elevated", false);
        state.set("savings", 50000.0);
        adjust(&mut state);

        let env = HashMap::from([("flood_event".to_string(), AttrValue::Bool(false))]);
        ValidationContext::new("a1", "household", 5, state, env)
            .unwrap()
            .with_recent_decisions(
                recent
                    .iter()
                    .map(|(year, skill)| RecentDecision {
                        year: *year,
                        skill_name: (*skill).to_string(),
                    })
                    .collect(),
            )
    }

    #[test]
    fn test_happy_path_all_stages_pass() {
        let council = ValidatorCouncil::standard(Arc::new(registry()));
        let proposal = SkillProposal::new("elevate_house")
            .unwrap()
            .with_construct("tp", json!("H"))
            .with_construct("cp", json!("H"));

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(outcome.passed);
        assert_eq!(outcome.results.len(), 6);
        assert!(outcome.results.iter().all(|r| r.valid));
        assert!(outcome.blocking_rule_ids().is_empty());
    }

    #[test]
    fn test_short_circuit_on_first_error() {
        let council = ValidatorCouncil::standard(Arc::new(registry()));
        let proposal = SkillProposal::new("build_ark").unwrap();

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(!outcome.passed);
        // Only admissibility ran.
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(
            outcome.blocking_rule_ids(),
            BTreeSet::from(["admissibility.unknown-skill".to_string()])
        );
        assert!(outcome.all_blocking_deterministic());
    }

    #[test]
    fn test_coherence_block_is_not_deterministic() {
        let council = ValidatorCouncil::standard(Arc::new(registry()));
        let proposal = SkillProposal::new("do_nothing")
            .unwrap()
            .with_construct("tp", json!("H"))
            .with_construct("cp", json!("H"));

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(!outcome.passed);
        assert!(!outcome.all_blocking_deterministic());
        assert_eq!(
            outcome.blocking_rule_ids(),
            BTreeSet::from(["coherence.threat-calls-for-action".to_string()])
        );
    }

    #[test]
    fn test_warnings_accumulate_without_blocking() {
        let council = ValidatorCouncil::standard(Arc::new(registry_with_warning_rule()));
        let proposal = SkillProposal::new("do_nothing")
            .unwrap()
            .with_construct("tp", json!("H"))
            .with_construct("cp", json!("H"));

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(outcome.passed);
        assert_eq!(outcome.warning_reports().len(), 1);
        assert_eq!(outcome.results.len(), 6);
    }

    #[test]
    fn test_composite_phase_detects_conflict() {
        let council = ValidatorCouncil::builder(Arc::new(registry()))
            .multi_skill(true)
            .build();
        let proposal = SkillProposal::new("elevate_house")
            .unwrap()
            .with_secondary("relocate")
            .unwrap();

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(!outcome.passed);
        assert!(
            outcome
                .blocking_rule_ids()
                .contains("composite.conflict")
        );
    }

    #[test]
    fn test_composite_phase_validates_secondary() {
        let council = ValidatorCouncil::builder(Arc::new(registry()))
            .multi_skill(true)
            .build();
        // Secondary fails feasibility: the agent is already elevated.
        let proposal = SkillProposal::new("buy_insurance")
            .unwrap()
            .with_secondary("elevate_house")
            .unwrap();

        let outcome =
            council.run_pipeline(&proposal, &context_with(&[], |s| s.set("elevated", true)));
        assert!(!outcome.passed);
        assert!(
            outcome
                .blocking_rule_ids()
                .contains("feasibility.preconditions")
        );
    }

    #[test]
    fn test_compatible_pair_passes() {
        let council = ValidatorCouncil::builder(Arc::new(registry()))
            .multi_skill(true)
            .build();
        let proposal = SkillProposal::new("elevate_house")
            .unwrap()
            .with_secondary("buy_insurance")
            .unwrap();

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(outcome.passed, "{:?}", outcome.blocking_rule_ids());
        // Primary stages + secondary stages.
        assert_eq!(outcome.results.len(), 12);
    }

    #[test]
    fn test_record_decision_reaches_stateful_checks() {
        use crate::validators::stateful::ConsecutiveLimitCheck;

        let council = ValidatorCouncil::builder(Arc::new(registry()))
            .domain_check(Box::new(ConsecutiveLimitCheck::new(
                "social.insurance-streak",
                "buy_insurance",
                2,
            )))
            .build();
        let proposal = SkillProposal::new("buy_insurance").unwrap();

        assert!(council.run_pipeline(&proposal, &context(&[])).passed);
        council.record_decision("a1", "buy_insurance");
        council.record_decision("a1", "buy_insurance");

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(!outcome.passed);
        assert!(
            outcome
                .blocking_rule_ids()
                .contains("social.insurance-streak")
        );

        // Another agent's streak is untouched.
        let outcome = council.run_pipeline(
            &proposal,
            &ValidationContext::new("a2", "household", 5, AgentState::new(), HashMap::new())
                .unwrap(),
        );
        assert!(outcome.passed);

        // Taking something else resets the streak.
        council.record_decision("a1", "do_nothing");
        assert!(council.run_pipeline(&proposal, &context(&[])).passed);
    }

    #[test]
    fn test_secondary_ignored_when_multi_skill_disabled() {
        let council = ValidatorCouncil::standard(Arc::new(registry()));
        let proposal = SkillProposal::new("elevate_house")
            .unwrap()
            .with_secondary("relocate")
            .unwrap();

        let outcome = council.run_pipeline(&proposal, &context(&[]));
        assert!(outcome.passed);
        assert_eq!(outcome.results.len(), 6);
    }
}
