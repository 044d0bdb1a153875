use std::collections::HashMap;

use parking_lot::RwLock;

use governance_core::{InterventionReport, SkillProposal, ValidationContext, ValidationResult};

use crate::validators::domain::{DomainCategory, DomainCheck};

/// Blocks a skill after it has been taken too many years in a row.
///
/// The counter advances through [`DomainCheck::on_decision`], which the
/// council fans out when the broker reports a successfully executed
/// decision, so retries within one decision never inflate the streak.
/// State is keyed by `(agent_id, rule_id)`, never global, so concurrent
/// runs over disjoint agents stay correct.
pub struct ConsecutiveLimitCheck {
    rule_id: String,
    watched_skill: String,
    max_consecutive: u32,
    counts: RwLock<HashMap<(String, String), u32>>,
}

impl ConsecutiveLimitCheck {
    pub fn new(
        rule_id: impl Into<String>,
        watched_skill: impl Into<String>,
        max_consecutive: u32,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            watched_skill: watched_skill.into(),
            max_consecutive,
            counts: RwLock::new(HashMap::new()),
        }
    }

    fn key(&self, agent_id: &str) -> (String, String) {
        (agent_id.to_string(), self.rule_id.clone())
    }

    pub fn streak(&self, agent_id: &str) -> u32 {
        self.counts.read().get(&self.key(agent_id)).copied().unwrap_or(0)
    }
}

impl DomainCheck for ConsecutiveLimitCheck {
    fn rule_id(&self) -> &str {
        &self.rule_id
    }

    fn category(&self) -> DomainCategory {
        DomainCategory::Social
    }

    fn check(&self, proposal: &SkillProposal, ctx: &ValidationContext) -> ValidationResult {
        if proposal.skill_name != self.watched_skill {
            return ValidationResult::pass("domain");
        }
        if self.streak(&ctx.agent_id) < self.max_consecutive {
            return ValidationResult::pass("domain");
        }
        ValidationResult::fail(
            "domain",
            InterventionReport::error(
                &self.rule_id,
                &proposal.skill_name,
                format!(
                    "'{}' has already been taken {} years in a row",
                    self.watched_skill, self.max_consecutive
                ),
            ),
        )
    }

    fn on_decision(&self, agent_id: &str, skill_name: &str) {
        let key = self.key(agent_id);
        let mut counts = self.counts.write();
        if skill_name == self.watched_skill {
            *counts.entry(key).or_insert(0) += 1;
        } else {
            counts.remove(&key);
        }
    }
}
