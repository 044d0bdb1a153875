use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use governance_core::{OrdinalRating, Severity};

fn default_severity() -> Severity {
    Severity::Error
}

/// Resource-based constraint on specific skills, evaluated over agent
/// state. The rule blocks when `require` evaluates to false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRule {
    pub id: String,

    /// Skills the rule applies to; empty means every skill.
    #[serde(default)]
    pub applies_to: Vec<String>,

    /// Boolean predicate over agent-state attributes.
    pub require: String,

    pub message: String,

    #[serde(default = "default_severity")]
    pub severity: Severity,
}

impl IdentityRule {
    pub fn applies_to_skill(&self, skill_name: &str) -> bool {
        self.applies_to.is_empty() || self.applies_to.iter().any(|s| s == skill_name)
    }
}

/// Coherence rule over LLM-authored appraisal constructs:
/// when every listed construct takes one of its listed ratings, the
/// listed skills are blocked (or merely observed, per severity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingRule {
    pub id: String,

    /// Construct label → admissible ratings. All entries must match for
    /// the rule to fire.
    pub when: BTreeMap<String, Vec<OrdinalRating>>,

    pub block: Vec<String>,

    #[serde(default = "default_severity")]
    pub severity: Severity,

    #[serde(default)]
    pub message: Option<String>,
}

impl ThinkingRule {
    pub fn blocks_skill(&self, skill_name: &str) -> bool {
        self.block.iter().any(|s| s == skill_name)
    }
}
