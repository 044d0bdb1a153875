use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use governance_core::{AgentState, GovernanceError, Result};
use governance_memory::MemoryConfig;

use crate::config::{AgentTypeSpec, RegistryConfig};
use crate::definition::SkillDefinition;
use crate::predicate;
use crate::rules::{IdentityRule, ThinkingRule};

/// Built per-agent-type configuration.
#[derive(Debug, Clone)]
pub struct AgentTypeConfig {
    pub name: String,
    pub fallback_skill: String,
    pub institutional: bool,
    pub memory: Option<MemoryConfig>,
    pub identity_rules: Vec<IdentityRule>,
    pub thinking_rules: Vec<ThinkingRule>,
    pub response_format: Option<String>,
    pub criteria_definitions: Option<String>,
    pub rating_scale: Option<String>,
}

/// Failed lookups are data for the admissibility validator, not process
/// faults, so they get their own small error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown skill '{0}'")]
    UnknownSkill(String),
    #[error("skill '{skill}' is not available to agent type '{agent_type}'")]
    NotEligible { skill: String, agent_type: String },
}

/// Authoritative, read-only action catalog shared across the pipeline.
pub struct SkillRegistry {
    skills: HashMap<String, Arc<SkillDefinition>>,
    aliases: HashMap<String, String>,
    agent_types: HashMap<String, AgentTypeConfig>,
}

impl SkillRegistry {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GovernanceError::Config(format!(
                "failed to read registry file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RegistryConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GovernanceError::Config(format!("failed to parse registry: {}", e)))?;
        Self::from_config(config)
    }

    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        let mut skills: HashMap<String, Arc<SkillDefinition>> = HashMap::new();
        let mut aliases: HashMap<String, String> = HashMap::new();

        for spec in &config.skills {
            let name = normalize(&spec.name);
            if skills.contains_key(&name) {
                return Err(GovernanceError::Config(format!(
                    "duplicate skill name '{}'",
                    name
                )));
            }
            if spec.agent_types.is_empty() {
                return Err(GovernanceError::Config(format!(
                    "skill '{}' declares no agent types",
                    name
                )));
            }

            let mut preconditions = Vec::with_capacity(spec.preconditions.len());
            for expr in &spec.preconditions {
                preconditions.push((expr.clone(), predicate::compile(expr)?));
            }

            let definition = SkillDefinition::build(
                name.clone(),
                spec.display_name.clone(),
                spec.agent_types.clone(),
                preconditions,
                spec.state_changes.clone(),
                spec.institutional_constraints.clone(),
                spec.magnitude_bounds,
                spec.composite_conflicts.iter().map(|s| normalize(s)).collect(),
                spec.exempt_from_coherence,
            );

            for alias in &spec.aliases {
                let alias = normalize(alias);
                if let Some(existing) = aliases.insert(alias.clone(), name.clone()) {
                    return Err(GovernanceError::Config(format!(
                        "alias '{}' maps to both '{}' and '{}'",
                        alias, existing, name
                    )));
                }
            }

            skills.insert(name, Arc::new(definition));
        }

        for (alias, target) in &aliases {
            if skills.contains_key(alias) {
                return Err(GovernanceError::Config(format!(
                    "alias '{}' collides with a skill name",
                    alias
                )));
            }
            debug_assert!(skills.contains_key(target));
        }

        for definition in skills.values() {
            for conflict in &definition.composite_conflicts {
                if !skills.contains_key(conflict) {
                    return Err(GovernanceError::Config(format!(
                        "skill '{}' declares composite conflict with unknown skill '{}'",
                        definition.name, conflict
                    )));
                }
            }
        }

        let mut agent_types = HashMap::new();
        for (type_name, spec) in config.agent_types {
            let built = Self::build_agent_type(&type_name, spec, &skills)?;
            agent_types.insert(type_name, built);
        }

        Ok(Self {
            skills,
            aliases,
            agent_types,
        })
    }

    fn build_agent_type(
        type_name: &str,
        spec: AgentTypeSpec,
        skills: &HashMap<String, Arc<SkillDefinition>>,
    ) -> Result<AgentTypeConfig> {
        let fallback = normalize(&spec.fallback_skill);
        let fallback_def = skills.get(&fallback).ok_or_else(|| {
            GovernanceError::Config(format!(
                "agent type '{}' declares unknown fallback skill '{}'",
                type_name, fallback
            ))
        })?;
        if !fallback_def.eligible_for(type_name) {
            return Err(GovernanceError::Config(format!(
                "fallback skill '{}' is not eligible for agent type '{}'",
                fallback, type_name
            )));
        }

        for rule in &spec.identity_rules {
            predicate::compile(&rule.require)?;
            for skill in &rule.applies_to {
                if !skills.contains_key(&normalize(skill)) {
                    return Err(GovernanceError::Config(format!(
                        "identity rule '{}' references unknown skill '{}'",
                        rule.id, skill
                    )));
                }
            }
        }
        for rule in &spec.thinking_rules {
            for skill in &rule.block {
                if !skills.contains_key(&normalize(skill)) {
                    return Err(GovernanceError::Config(format!(
                        "thinking rule '{}' blocks unknown skill '{}'",
                        rule.id, skill
                    )));
                }
            }
        }

        Ok(AgentTypeConfig {
            name: type_name.to_string(),
            fallback_skill: fallback,
            institutional: spec.institutional,
            memory: spec.memory,
            identity_rules: spec.identity_rules,
            thinking_rules: spec.thinking_rules,
            response_format: spec.response_format,
            criteria_definitions: spec.criteria_definitions,
            rating_scale: spec.rating_scale,
        })
    }

    /// Normalize and resolve a skill name or alias, then check agent-type
    /// eligibility.
    pub fn resolve(
        &self,
        name_or_alias: &str,
        agent_type: &str,
    ) -> std::result::Result<Arc<SkillDefinition>, LookupError> {
        let normalized = normalize(name_or_alias);
        let canonical = self
            .aliases
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized);

        let definition = self
            .skills
            .get(&canonical)
            .ok_or_else(|| LookupError::UnknownSkill(name_or_alias.trim().to_string()))?;

        if !definition.eligible_for(agent_type) {
            return Err(LookupError::NotEligible {
                skill: canonical,
                agent_type: agent_type.to_string(),
            });
        }
        Ok(Arc::clone(definition))
    }

    /// All skills eligible for the agent type, sorted by name so every
    /// downstream enumeration is deterministic.
    pub fn eligible_for(&self, agent_type: &str) -> Vec<Arc<SkillDefinition>> {
        let mut eligible: Vec<Arc<SkillDefinition>> = self
            .skills
            .values()
            .filter(|def| def.eligible_for(agent_type))
            .cloned()
            .collect();
        eligible.sort_by(|a, b| a.name.cmp(&b.name));
        eligible
    }

    pub fn check_preconditions(&self, skill: &SkillDefinition, state: &AgentState) -> bool {
        skill.preconditions_hold(state)
    }

    /// True iff the pair is declared conflicting (in either direction).
    pub fn check_composite_conflicts(&self, primary: &str, secondary: &str) -> bool {
        let primary = normalize(primary);
        let secondary = normalize(secondary);
        let forward = self
            .skills
            .get(&primary)
            .map(|def| def.conflicts_with(&secondary))
            .unwrap_or(false);
        let backward = self
            .skills
            .get(&secondary)
            .map(|def| def.conflicts_with(&primary))
            .unwrap_or(false);
        forward || backward
    }

    pub fn agent_type(&self, name: &str) -> Option<&AgentTypeConfig> {
        self.agent_types.get(name)
    }

    pub fn fallback_for(&self, agent_type: &str) -> Option<&str> {
        self.agent_types
            .get(agent_type)
            .map(|config| config.fallback_skill.as_str())
    }

    pub fn get(&self, name: &str) -> Option<Arc<SkillDefinition>> {
        self.skills.get(&normalize(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_YAML: &str = r#"
skills:
  - name: do_nothing
    agent_types: [household]
  - name: elevate_house
    aliases: [elevation, "Elevate"]
    agent_types: [household]
    preconditions:
      - "elevated == false"
    state_changes:
      elevated: true
    institutional_constraints: [once_only]
    composite_conflicts: [relocate]
  - name: relocate
    agent_types: [household]
  - name: maintain_demand
    agent_types: [irrigation_district]
agent_types:
  household:
    fallback_skill: do_nothing
  irrigation_district:
    fallback_skill: maintain_demand
    institutional: true
"#;

    fn registry() -> SkillRegistry {
        SkillRegistry::from_yaml_str(REGISTRY_YAML).unwrap()
    }

    #[test]
    fn test_resolve_with_normalization_and_alias() {
        let registry = registry();

        let direct = registry.resolve("elevate_house", "household").unwrap();
        assert_eq!(direct.name, "elevate_house");

        let aliased = registry.resolve("  Elevation ", "household").unwrap();
        assert_eq!(aliased.name, "elevate_house");

        let cased = registry.resolve("ELEVATE", "household").unwrap();
        assert_eq!(cased.name, "elevate_house");
    }

    #[test]
    fn test_resolve_errors() {
        let registry = registry();

        assert_eq!(
            registry.resolve("build_ark", "household").unwrap_err(),
            LookupError::UnknownSkill("build_ark".into())
        );
        assert_eq!(
            registry.resolve("maintain_demand", "household").unwrap_err(),
            LookupError::NotEligible {
                skill: "maintain_demand".into(),
                agent_type: "household".into()
            }
        );
    }

    #[test]
    fn test_eligible_for_is_sorted() {
        let registry = registry();
        let names: Vec<String> = registry
            .eligible_for("household")
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["do_nothing", "elevate_house", "relocate"]);
    }

    #[test]
    fn test_composite_conflicts_symmetric() {
        let registry = registry();
        assert!(registry.check_composite_conflicts("elevate_house", "relocate"));
        assert!(registry.check_composite_conflicts("relocate", "elevate_house"));
        assert!(!registry.check_composite_conflicts("elevate_house", "do_nothing"));
    }

    #[test]
    fn test_fallback_lookup_and_exemption_flag() {
        let registry = registry();
        assert_eq!(registry.fallback_for("household"), Some("do_nothing"));
        // The exemption flag is authored, not implied by fallback status:
        // LLM-proposed fallbacks still face the thinking rules.
        assert!(!registry.get("do_nothing").unwrap().exempt_from_coherence);
    }

    #[test]
    fn test_missing_fallback_is_fatal() {
        let yaml = r#"
skills:
  - name: pump_water
    agent_types: [district]
agent_types:
  district:
    fallback_skill: maintain_demand
"#;
        assert!(matches!(
            SkillRegistry::from_yaml_str(yaml),
            Err(GovernanceError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_conflict_is_fatal() {
        let yaml = r#"
skills:
  - name: a
    agent_types: [t]
    composite_conflicts: [ghost]
agent_types:
  t:
    fallback_skill: a
"#;
        assert!(matches!(
            SkillRegistry::from_yaml_str(yaml),
            Err(GovernanceError::Config(_))
        ));
    }

    #[test]
    fn test_bad_precondition_is_fatal() {
        let yaml = r#"
skills:
  - name: a
    agent_types: [t]
    preconditions: ["savings >="]
agent_types:
  t:
    fallback_skill: a
"#;
        assert!(matches!(
            SkillRegistry::from_yaml_str(yaml),
            Err(GovernanceError::Config(_))
        ));
    }
}
