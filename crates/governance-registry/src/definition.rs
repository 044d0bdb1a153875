use std::collections::{HashMap, HashSet};

use evalexpr::Node;
use serde::{Deserialize, Serialize};

use governance_core::{AgentState, AttrValue};

use crate::predicate;

/// Institutional constraint on how often a skill may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionalConstraint {
    /// At most once over the agent's lifetime.
    OnceOnly,
    /// At most once per simulation year.
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeBounds {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub default: Option<f64>,
}

impl MagnitudeBounds {
    pub fn contains(&self, magnitude: f64) -> bool {
        magnitude >= self.min && magnitude <= self.max
    }
}

/// A fully built catalog entry. Immutable after registry load.
#[derive(Debug, Clone)]
pub struct SkillDefinition {
    pub name: String,
    pub display_name: String,
    pub agent_types: HashSet<String>,
    preconditions: Vec<(String, Node)>,
    pub state_changes: HashMap<String, AttrValue>,
    pub institutional_constraints: Vec<InstitutionalConstraint>,
    pub magnitude_bounds: Option<MagnitudeBounds>,
    pub composite_conflicts: HashSet<String>,
    pub exempt_from_coherence: bool,
}

impl SkillDefinition {
    pub(crate) fn build(
        name: String,
        display_name: Option<String>,
        agent_types: Vec<String>,
        preconditions: Vec<(String, Node)>,
        state_changes: HashMap<String, AttrValue>,
        institutional_constraints: Vec<InstitutionalConstraint>,
        magnitude_bounds: Option<MagnitudeBounds>,
        composite_conflicts: Vec<String>,
        exempt_from_coherence: bool,
    ) -> Self {
        Self {
            display_name: display_name.unwrap_or_else(|| name.clone()),
            name,
            agent_types: agent_types.into_iter().collect(),
            preconditions,
            state_changes,
            institutional_constraints,
            magnitude_bounds,
            composite_conflicts: composite_conflicts.into_iter().collect(),
            exempt_from_coherence,
        }
    }

    pub fn eligible_for(&self, agent_type: &str) -> bool {
        self.agent_types.contains(agent_type)
    }

    /// True iff every precondition predicate holds in the given state.
    pub fn preconditions_hold(&self, state: &AgentState) -> bool {
        self.preconditions
            .iter()
            .all(|(_, node)| predicate::evaluate(node, state))
    }

    /// The source expressions of preconditions that fail in this state.
    pub fn failed_preconditions(&self, state: &AgentState) -> Vec<&str> {
        self.preconditions
            .iter()
            .filter(|(_, node)| !predicate::evaluate(node, state))
            .map(|(expr, _)| expr.as_str())
            .collect()
    }

    pub fn has_constraint(&self, constraint: InstitutionalConstraint) -> bool {
        self.institutional_constraints.contains(&constraint)
    }

    pub fn conflicts_with(&self, other: &str) -> bool {
        self.composite_conflicts.contains(other)
    }
}
