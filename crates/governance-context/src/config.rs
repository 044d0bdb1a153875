use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One verbalization bin: values up to `upper` read as `phrase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbalBin {
    pub upper: f64,
    pub phrase: String,
}

/// Environment-signal rule emitting a retrieval booster, e.g.
/// `flood_event == true` → `{flood: 1.0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoosterRule {
    /// Predicate over the environment snapshot.
    pub signal: String,
    pub tag: String,
    #[serde(default = "default_booster_weight")]
    pub weight: f64,
}

fn default_booster_weight() -> f64 {
    1.0
}

/// Shape of the assembled payload for one agent type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Agent-state attributes placed in the personal tier; empty routes
    /// every attribute there.
    #[serde(default)]
    pub personal_fields: Vec<String>,

    /// Environment fields lifted into the global tier; the rest of the
    /// snapshot lands in the local tier.
    #[serde(default)]
    pub global_fields: Vec<String>,

    /// Numeric attribute → qualitative phrasing bins.
    #[serde(default)]
    pub verbalization: HashMap<String, Vec<VerbalBin>>,

    #[serde(default)]
    pub booster_rules: Vec<BoosterRule>,

    /// Shuffle the option order to break positional bias. Driven by the
    /// builder's seeded RNG, so runs stay reproducible.
    #[serde(default)]
    pub shuffle_options: bool,

    #[serde(default)]
    pub skill_variant: Option<String>,
}
