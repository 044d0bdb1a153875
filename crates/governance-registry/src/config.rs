use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use governance_core::AttrValue;
use governance_memory::MemoryConfig;

use crate::definition::{InstitutionalConstraint, MagnitudeBounds};
use crate::rules::{IdentityRule, ThinkingRule};

/// Raw shape of the declarative registry artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub skills: Vec<SkillSpec>,
    pub agent_types: HashMap<String, AgentTypeSpec>,
}

/// One skill entry as authored in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSpec {
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    pub agent_types: Vec<String>,

    /// Boolean predicates over agent-state attributes.
    #[serde(default)]
    pub preconditions: Vec<String>,

    /// Template of the state delta this skill produces when executed.
    #[serde(default)]
    pub state_changes: HashMap<String, AttrValue>,

    #[serde(default)]
    pub institutional_constraints: Vec<InstitutionalConstraint>,

    #[serde(default)]
    pub magnitude_bounds: Option<MagnitudeBounds>,

    #[serde(default)]
    pub composite_conflicts: Vec<String>,

    /// Skills exempt from construct-conditioned thinking rules.
    #[serde(default)]
    pub exempt_from_coherence: bool,
}

/// Per-agent-type configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTypeSpec {
    pub fallback_skill: String,

    /// Institutional agents may write institutional state fields;
    /// everyone else is blocked by the effect-safety validator.
    #[serde(default)]
    pub institutional: bool,

    #[serde(default)]
    pub memory: Option<MemoryConfig>,

    #[serde(default)]
    pub identity_rules: Vec<IdentityRule>,

    #[serde(default)]
    pub thinking_rules: Vec<ThinkingRule>,

    #[serde(default)]
    pub response_format: Option<String>,

    #[serde(default)]
    pub criteria_definitions: Option<String>,

    #[serde(default)]
    pub rating_scale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_registry_yaml() {
        let yaml = r#"
skills:
  - name: do_nothing
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
    composite_conflicts: [relocate]
agent_types:
  household:
    fallback_skill: do_nothing
"#;
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.skills.len(), 2);
        assert_eq!(config.skills[1].aliases, vec!["elevation"]);
        assert_eq!(
            config.skills[1].institutional_constraints,
            vec![InstitutionalConstraint::OnceOnly]
        );
        assert_eq!(config.agent_types["household"].fallback_skill, "do_nothing");
        assert!(!config.agent_types["household"].institutional);
    }

    #[test]
    fn test_agent_type_with_rules() {
        let yaml = r#"
fallback_skill: maintain_demand
institutional: true
identity_rules:
  - id: budget
    require: "budget >= 0"
    message: "budget exhausted"
thinking_rules:
  - id: scarcity-demands-cuts
    when:
      water_stress: [VH]
    block: [increase_demand]
"#;
        let spec: AgentTypeSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.institutional);
        assert_eq!(spec.identity_rules.len(), 1);
        assert_eq!(spec.thinking_rules.len(), 1);
    }
}
