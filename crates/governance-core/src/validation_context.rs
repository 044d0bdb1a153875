use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::state::{AgentState, AttrValue};

/// One past decision, kept so institutional constraints (`once_only`,
/// `annual`) can be checked without reaching back into the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentDecision {
    pub year: u32,
    pub skill_name: String,
}

/// Merged read-only view a validator sees: agent state, the environment
/// snapshot for the current year, and the agent's recent decisions.
///
/// Environment keys must not shadow agent-state keys; a collision is a
/// domain configuration bug and fails construction.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub agent_id: String,
    pub agent_type: String,
    pub year: u32,
    pub state: AgentState,
    pub environment: HashMap<String, AttrValue>,
    pub recent_decisions: Vec<RecentDecision>,
}

impl ValidationContext {
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        year: u32,
        state: AgentState,
        environment: HashMap<String, AttrValue>,
    ) -> Result<Self> {
        for key in environment.keys() {
            if state.contains(key) {
                return Err(GovernanceError::Config(format!(
                    "environment key '{}' shadows an agent-state attribute",
                    key
                )));
            }
        }
        Ok(Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            year,
            state,
            environment,
            recent_decisions: Vec::new(),
        })
    }

    pub fn with_recent_decisions(mut self, decisions: Vec<RecentDecision>) -> Self {
        self.recent_decisions = decisions;
        self
    }

    /// Unified lookup over the merged view. Agent state wins by
    /// construction since collisions are rejected up front.
    pub fn lookup(&self, key: &str) -> Option<&AttrValue> {
        self.state.get(key).or_else(|| self.environment.get(key))
    }

    pub fn took_skill_ever(&self, skill_name: &str) -> bool {
        self.recent_decisions
            .iter()
            .any(|d| d.skill_name == skill_name)
    }

    pub fn took_skill_in_year(&self, skill_name: &str, year: u32) -> bool {
        self.recent_decisions
            .iter()
            .any(|d| d.skill_name == skill_name && d.year == year)
    }
}
