use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Recency window plus top-k long-term by decayed importance.
    Basic,
    /// Unified salience score over the whole candidate set.
    #[default]
    Weighted,
}

/// Term weights of the salience score
/// `S = w_r·R + w_i·I + w_c·C + w_rel·Rel − w_int·Int`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalWeights {
    #[serde(default = "default_recency")]
    pub recency: f64,
    #[serde(default = "default_importance")]
    pub importance: f64,
    #[serde(default = "default_context")]
    pub context: f64,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub interference: f64,
}

fn default_recency() -> f64 {
    0.3
}

fn default_importance() -> f64 {
    0.5
}

fn default_context() -> f64 {
    0.2
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            recency: default_recency(),
            importance: default_importance(),
            context: default_context(),
            relevance: 0.0,
            interference: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,

    /// `None` leaves the long-term tier unbounded.
    #[serde(default)]
    pub long_term_capacity: Option<usize>,

    /// λ of the exponential decay `I(t) = I₀·exp(-λ·age)`.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    /// Minimum initial importance for consolidation to be considered.
    #[serde(default = "default_consolidation_gate")]
    pub consolidation_gate: f64,

    /// Probability that a gated item is actually burned into long-term.
    #[serde(default = "default_burn_probability")]
    pub burn_probability: f64,

    #[serde(default)]
    pub mode: RankingMode,

    #[serde(default)]
    pub weights: RetrievalWeights,

    /// Cap γ on the retroactive-interference penalty.
    #[serde(default = "default_interference_cap")]
    pub interference_cap: f64,

    /// Retrieval count under habitual processing (SYSTEM_1).
    #[serde(default = "default_habitual_top_k")]
    pub habitual_top_k: usize,

    /// Retrieval count under alert processing (SYSTEM_2).
    #[serde(default = "default_alert_top_k")]
    pub alert_top_k: usize,

    /// High-importance long-term items added regardless of arousal.
    #[serde(default = "default_supplemental_top_k")]
    pub supplemental_top_k: usize,

    /// Surprise above this switches retrieval to SYSTEM_2.
    #[serde(default = "default_arousal_threshold")]
    pub arousal_threshold: f64,

    #[serde(default = "default_emotion_weights")]
    pub emotion_weights: HashMap<String, f64>,

    #[serde(default = "default_source_weights")]
    pub source_weights: HashMap<String, f64>,
}

fn default_working_capacity() -> usize {
    5
}

fn default_decay_rate() -> f64 {
    0.1
}

fn default_consolidation_gate() -> f64 {
    0.6
}

fn default_burn_probability() -> f64 {
    0.8
}

fn default_interference_cap() -> f64 {
    0.8
}

fn default_habitual_top_k() -> usize {
    5
}

fn default_alert_top_k() -> usize {
    7
}

fn default_supplemental_top_k() -> usize {
    2
}

fn default_arousal_threshold() -> f64 {
    0.5
}

fn default_emotion_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("critical".to_string(), 1.0),
        ("major".to_string(), 0.9),
        ("routine".to_string(), 0.1),
    ])
}

fn default_source_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("personal".to_string(), 1.0),
        ("neighbor".to_string(), 0.7),
        ("community".to_string(), 0.5),
        ("reflection".to_string(), 1.0),
        ("abstract".to_string(), 0.8),
    ])
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            working_capacity: default_working_capacity(),
            long_term_capacity: None,
            decay_rate: default_decay_rate(),
            consolidation_gate: default_consolidation_gate(),
            burn_probability: default_burn_probability(),
            mode: RankingMode::default(),
            weights: RetrievalWeights::default(),
            interference_cap: default_interference_cap(),
            habitual_top_k: default_habitual_top_k(),
            alert_top_k: default_alert_top_k(),
            supplemental_top_k: default_supplemental_top_k(),
            arousal_threshold: default_arousal_threshold(),
            emotion_weights: default_emotion_weights(),
            source_weights: default_source_weights(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.working_capacity, 5);
        assert_eq!(config.decay_rate, 0.1);
        assert_eq!(config.consolidation_gate, 0.6);
        assert_eq!(config.burn_probability, 0.8);
        assert_eq!(config.weights.recency, 0.3);
        assert_eq!(config.weights.importance, 0.5);
        assert_eq!(config.weights.context, 0.2);
        assert_eq!(config.weights.relevance, 0.0);
        assert_eq!(config.weights.interference, 0.0);
        assert_eq!(config.interference_cap, 0.8);
        assert_eq!(config.habitual_top_k, 5);
        assert_eq!(config.alert_top_k, 7);
        assert_eq!(config.arousal_threshold, 0.5);
        assert_eq!(config.emotion_weights["critical"], 1.0);
        assert_eq!(config.source_weights["neighbor"], 0.7);
    }
}
