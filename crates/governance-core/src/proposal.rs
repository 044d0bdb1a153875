use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::execution::ExecutionResult;
use crate::rating::OrdinalRating;
use crate::validation::{InterventionReport, ValidationResult};

/// Option id → skill name, as presented to the LLM for the current
/// decision. Ordered so option "1" always renders first.
pub type DynamicSkillMap = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq)]
pub enum ProposalError {
    #[error("primary skill name must not be empty")]
    EmptyPrimary,
    #[error("secondary skill '{0}' duplicates the primary")]
    DuplicateSecondary(String),
}

/// An unvalidated, LLM-authored candidate action.
///
/// The reasoning payload is free-schema by design; appraisal constructs
/// are read back through [`SkillProposal::rating`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProposal {
    pub skill_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_skill_name: Option<String>,
    #[serde(default)]
    pub reasoning: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl SkillProposal {
    pub fn new(skill_name: impl Into<String>) -> Result<Self, ProposalError> {
        let skill_name = skill_name.into();
        if skill_name.trim().is_empty() {
            return Err(ProposalError::EmptyPrimary);
        }
        Ok(Self {
            skill_name,
            secondary_skill_name: None,
            reasoning: BTreeMap::new(),
            magnitude: None,
            rationale: None,
        })
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Result<Self, ProposalError> {
        let secondary = secondary.into();
        if secondary == self.skill_name {
            return Err(ProposalError::DuplicateSecondary(secondary));
        }
        self.secondary_skill_name = Some(secondary);
        Ok(self)
    }

    pub fn with_construct(mut self, key: impl Into<String>, value: Value) -> Self {
        self.reasoning.insert(key.into(), value);
        self
    }

    /// Typed accessor for a well-known appraisal construct. Returns `None`
    /// when the key is absent or the value is not on the ordinal scale.
    pub fn rating(&self, key: &str) -> Option<OrdinalRating> {
        match self.reasoning.get(key)? {
            Value::String(s) => OrdinalRating::parse(s),
            _ => None,
        }
    }
}

/// Terminal status of one broker decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionOutcome {
    Approved,
    Rejected,
}

/// A proposal that cleared the validator council, or the declared
/// fallback after retries were exhausted. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedSkill {
    pub proposal: SkillProposal,
    pub agent_id: String,
    pub year: u32,
    pub outcome: DecisionOutcome,
    pub retry_count: u32,
    pub results: Vec<ValidationResult>,
}

impl ApprovedSkill {
    pub fn skill_name(&self) -> &str {
        &self.proposal.skill_name
    }

    pub fn is_fallback(&self) -> bool {
        self.outcome == DecisionOutcome::Rejected
    }
}

/// Everything a `post_step` hook gets to see about one finished decision.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub approved: ApprovedSkill,
    pub execution: ExecutionResult,
    pub reports: Vec<InterventionReport>,
    pub llm_calls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_primary_rejected() {
        assert_eq!(SkillProposal::new("  "), Err(ProposalError::EmptyPrimary));
    }

    #[test]
    fn test_duplicate_secondary_rejected() {
        let result = SkillProposal::new("buy_insurance")
            .unwrap()
            .with_secondary("buy_insurance");
        assert_eq!(
            result,
            Err(ProposalError::DuplicateSecondary("buy_insurance".into()))
        );
    }

    #[test]
    fn test_rating_accessor() {
        let proposal = SkillProposal::new("elevate_house")
            .unwrap()
            .with_construct("tp", json!("H"))
            .with_construct("cp", json!("Very High"))
            .with_construct("note", json!(3));

        assert_eq!(proposal.rating("tp"), Some(OrdinalRating::High));
        assert_eq!(proposal.rating("cp"), Some(OrdinalRating::VeryHigh));
        assert_eq!(proposal.rating("note"), None);
        assert_eq!(proposal.rating("missing"), None);
    }
}
