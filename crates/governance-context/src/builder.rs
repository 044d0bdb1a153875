use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Value, json};

use governance_core::{AgentProfile, AttrValue, DynamicSkillMap, GovernanceError, Result};
use governance_memory::{MemoryEngine, RetrievalQuery};
use governance_registry::{SkillRegistry, predicate};

use crate::config::ContextConfig;
use crate::render::TemplateRenderer;
use crate::verbalize::verbalize;

/// Everything one decision's prompt needs, plus the option map the
/// adapter will use to resolve numeric replies.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub payload: HashMap<String, Value>,
    pub skill_map: DynamicSkillMap,
    pub options: Vec<String>,
    pub boosters: HashMap<String, f64>,
}

impl AssembledContext {
    pub fn options_text(&self) -> &str {
        self.payload
            .get("options_text")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Assembles the per-decision prompt payload.
pub struct ContextBuilder {
    registry: Arc<SkillRegistry>,
    config: ContextConfig,
    renderer: TemplateRenderer,
    rng: StdRng,
}

impl ContextBuilder {
    pub fn new(registry: Arc<SkillRegistry>, config: ContextConfig, seed: u64) -> Self {
        Self {
            registry,
            config,
            renderer: TemplateRenderer::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build the payload for one agent-step. Memory retrieval gets the
    /// environment snapshot as `world_state` so an attached surprise
    /// plugin can react to it.
    pub fn build(
        &mut self,
        memory: &mut MemoryEngine,
        agent: &AgentProfile,
        env: &HashMap<String, AttrValue>,
        year: u32,
    ) -> Result<AssembledContext> {
        let boosters = self.derive_boosters(env);

        let query = RetrievalQuery::for_year(year)
            .with_boosters(&boosters)
            .with_world_state(env);
        let memories = memory.retrieve(&agent.id, &query);

        let (options, skill_map) = self.filter_skills(agent)?;
        let options_text = options
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}. {}", i + 1, name))
            .collect::<Vec<_>>()
            .join("\n");

        let mut payload = HashMap::new();
        payload.insert("personal".to_string(), self.personal_tier(agent));
        let (local, global) = self.environment_tiers(env);
        payload.insert("local".to_string(), local);
        payload.insert("global".to_string(), global);
        payload.insert("memory".to_string(), json!(memories));
        payload.insert("options_text".to_string(), json!(options_text));
        payload.insert("dynamic_skill_map".to_string(), json!(skill_map));
        payload.insert("year".to_string(), json!(year));
        payload.insert("agent_id".to_string(), json!(agent.id));

        if let Some(variant) = &self.config.skill_variant {
            payload.insert("skill_variant".to_string(), json!(variant));
        }
        if let Some(config) = self.registry.agent_type(&agent.agent_type) {
            if let Some(text) = &config.criteria_definitions {
                payload.insert("criteria_definitions".to_string(), json!(text));
            }
            if let Some(text) = &config.rating_scale {
                payload.insert("rating_scale".to_string(), json!(text));
            }
            if let Some(text) = &config.response_format {
                payload.insert("response_format".to_string(), json!(text));
            }
        }

        Ok(AssembledContext {
            payload,
            skill_map,
            options,
            boosters,
        })
    }

    pub fn render_prompt(&self, template: &str, context: &AssembledContext) -> Result<String> {
        self.renderer.render(template, &context.payload)
    }

    /// Skills whose preconditions hold right now, with the numeric
    /// option map the LLM will answer against. The two views are always
    /// consistent: `skill_map[i+1] == options[i]`.
    fn filter_skills(&mut self, agent: &AgentProfile) -> Result<(Vec<String>, DynamicSkillMap)> {
        let mut options: Vec<String> = self
            .registry
            .eligible_for(&agent.agent_type)
            .iter()
            .filter(|def| def.preconditions_hold(&agent.state))
            .map(|def| def.name.clone())
            .collect();

        if options.is_empty() {
            return Err(GovernanceError::Config(format!(
                "no feasible skills for agent type '{}'",
                agent.agent_type
            )));
        }

        if self.config.shuffle_options {
            options.shuffle(&mut self.rng);
        }

        let skill_map: DynamicSkillMap = options
            .iter()
            .enumerate()
            .map(|(i, name)| ((i + 1).to_string(), name.clone()))
            .collect();

        Ok((options, skill_map))
    }

    fn personal_tier(&self, agent: &AgentProfile) -> Value {
        let mut tier = serde_json::Map::new();
        for (key, value) in agent.state.iter() {
            if !self.config.personal_fields.is_empty()
                && !self.config.personal_fields.contains(key)
            {
                continue;
            }
            tier.insert(key.clone(), self.render_value(key, value));
        }
        Value::Object(tier)
    }

    fn environment_tiers(&self, env: &HashMap<String, AttrValue>) -> (Value, Value) {
        let mut local = serde_json::Map::new();
        let mut global = serde_json::Map::new();
        for (key, value) in env {
            let rendered = self.render_value(key, value);
            if self.config.global_fields.contains(key) {
                global.insert(key.clone(), rendered);
            } else {
                local.insert(key.clone(), rendered);
            }
        }
        (Value::Object(local), Value::Object(global))
    }

    fn render_value(&self, key: &str, value: &AttrValue) -> Value {
        match self.config.verbalization.get(key) {
            Some(bins) => json!(verbalize(value, bins)),
            None => match value {
                AttrValue::Bool(b) => json!(b),
                AttrValue::Number(n) => json!(n),
                AttrValue::Text(s) => json!(s),
            },
        }
    }

    fn derive_boosters(&self, env: &HashMap<String, AttrValue>) -> HashMap<String, f64> {
        let env_state: governance_core::AgentState = env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut boosters = HashMap::new();
        for rule in &self.config.booster_rules {
            let Ok(node) = predicate::compile(&rule.signal) else {
                tracing::warn!(signal = %rule.signal, "booster signal does not compile");
                continue;
            };
            if predicate::evaluate(&node, &env_state) {
                boosters.insert(rule.tag.clone(), rule.weight);
            }
        }
        boosters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoosterRule, VerbalBin};
    use governance_core::AgentState;
    use governance_memory::{MemoryConfig, MemorySource, ObservationMeta};

    const REGISTRY_YAML: &str = r#"
skills:
  - name: do_nothing
    agent_types: [household]
  - name: elevate_house
    agent_types: [household]
    preconditions:
      - "elevated == false"
  - name: buy_insurance
    agent_types: [household]
agent_types:
  household:
    fallback_skill: do_nothing
    rating_scale: "VL, L, M, H, VH"
    response_format: "{\"decision\": <option id>}"
"#;

    fn registry() -> Arc<SkillRegistry> {
        Arc::new(SkillRegistry::from_yaml_str(REGISTRY_YAML).unwrap())
    }

    fn agent(elevated: bool) -> AgentProfile {
        let mut state = AgentState::new();
        state.set("elevated", elevated);
        state.set("trust", 0.6);
        AgentProfile::new("a1", "household", state)
    }

    fn memory() -> MemoryEngine {
        MemoryEngine::new(MemoryConfig::default(), 1)
    }

    #[test]
    fn test_skill_map_consistent_with_options() {
        let mut builder = ContextBuilder::new(registry(), ContextConfig::default(), 0);
        let mut memory = memory();

        let ctx = builder
            .build(&mut memory, &agent(false), &HashMap::new(), 3)
            .unwrap();

        assert_eq!(ctx.options.len(), ctx.skill_map.len());
        for (i, name) in ctx.options.iter().enumerate() {
            assert_eq!(ctx.skill_map[&(i + 1).to_string()], *name);
        }
    }

    #[test]
    fn test_precondition_filtering_drops_elevation() {
        let mut builder = ContextBuilder::new(registry(), ContextConfig::default(), 0);
        let mut memory = memory();

        let ctx = builder
            .build(&mut memory, &agent(true), &HashMap::new(), 3)
            .unwrap();

        assert!(!ctx.options.contains(&"elevate_house".to_string()));
        assert_eq!(ctx.options.len(), 2);
    }

    #[test]
    fn test_shuffle_is_deterministic_under_seed() {
        let build_options = |seed| {
            let config = ContextConfig {
                shuffle_options: true,
                ..Default::default()
            };
            let mut builder = ContextBuilder::new(registry(), config, seed);
            let mut memory = memory();
            builder
                .build(&mut memory, &agent(false), &HashMap::new(), 3)
                .unwrap()
                .options
        };
        assert_eq!(build_options(9), build_options(9));
    }

    #[test]
    fn test_verbalization_in_personal_tier() {
        let config = ContextConfig {
            verbalization: HashMap::from([(
                "trust".to_string(),
                vec![
                    VerbalBin { upper: 0.3, phrase: "distrustful".into() },
                    VerbalBin { upper: 1.0, phrase: "trusting".into() },
                ],
            )]),
            ..Default::default()
        };
        let mut builder = ContextBuilder::new(registry(), config, 0);
        let mut memory = memory();

        let ctx = builder
            .build(&mut memory, &agent(false), &HashMap::new(), 3)
            .unwrap();
        assert_eq!(ctx.payload["personal"]["trust"], json!("trusting"));
    }

    #[test]
    fn test_environment_tier_routing() {
        let config = ContextConfig {
            global_fields: vec!["policy_subsidy".to_string()],
            ..Default::default()
        };
        let mut builder = ContextBuilder::new(registry(), config, 0);
        let mut memory = memory();

        let env = HashMap::from([
            ("flood_depth".to_string(), AttrValue::Number(0.4)),
            ("policy_subsidy".to_string(), AttrValue::Number(0.5)),
        ]);
        let ctx = builder.build(&mut memory, &agent(false), &env, 3).unwrap();

        assert!(ctx.payload["local"]["flood_depth"].is_number());
        assert!(ctx.payload["global"]["policy_subsidy"].is_number());
        assert!(ctx.payload["local"].get("policy_subsidy").is_none());
    }

    #[test]
    fn test_booster_rules_fire_on_signal() {
        let config = ContextConfig {
            booster_rules: vec![BoosterRule {
                signal: "flood_event == true".to_string(),
                tag: "flood".to_string(),
                weight: 1.0,
            }],
            ..Default::default()
        };
        let mut builder = ContextBuilder::new(registry(), config, 0);
        let mut memory = memory();

        let quiet = HashMap::from([("flood_event".to_string(), AttrValue::Bool(false))]);
        let ctx = builder.build(&mut memory, &agent(false), &quiet, 3).unwrap();
        assert!(ctx.boosters.is_empty());

        let flooded = HashMap::from([("flood_event".to_string(), AttrValue::Bool(true))]);
        let ctx = builder.build(&mut memory, &agent(false), &flooded, 3).unwrap();
        assert_eq!(ctx.boosters.get("flood"), Some(&1.0));
    }

    #[test]
    fn test_memory_lines_reach_payload() {
        let mut builder = ContextBuilder::new(registry(), ContextConfig::default(), 0);
        let mut memory = memory();
        memory.add(
            "a1",
            "the levee held last spring",
            ObservationMeta::new("routine", MemorySource::Personal, 2),
        );

        let ctx = builder
            .build(&mut memory, &agent(false), &HashMap::new(), 3)
            .unwrap();
        let lines = ctx.payload["memory"].as_array().unwrap();
        assert_eq!(lines[0], json!("the levee held last spring"));
    }

    #[test]
    fn test_prompt_renders_template_variables() {
        let mut builder = ContextBuilder::new(registry(), ContextConfig::default(), 0);
        let mut memory = memory();

        let ctx = builder
            .build(&mut memory, &agent(false), &HashMap::new(), 3)
            .unwrap();
        let template = "Rate using {{ rating_scale }}.\n{{ options_text }}\nReply as {{ response_format }}";
        let prompt = builder.render_prompt(template, &ctx).unwrap();

        assert!(prompt.contains("VL, L, M, H, VH"));
        assert!(prompt.contains("1. buy_insurance"));
        assert!(prompt.contains(r#"{"decision": <option id>}"#));
    }
}
