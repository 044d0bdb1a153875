use std::collections::{BTreeSet, HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use governance_core::AttrValue;

use crate::config::{MemoryConfig, RankingMode};
use crate::item::{MemoryItem, MemorySource};
use crate::store::AgentMemoryStore;
use crate::surprise::{CognitiveSystem, NoSurprise, SurprisePlugin};

/// Ingestion metadata accompanying one observation.
#[derive(Debug, Clone)]
pub struct ObservationMeta {
    pub emotion: String,
    pub source: MemorySource,
    pub year: u32,
    pub tags: BTreeSet<String>,
    /// Overrides the derived `emotion × source` importance when set
    /// (reflection insights use this).
    pub importance: Option<f64>,
}

impl ObservationMeta {
    pub fn new(emotion: impl Into<String>, source: MemorySource, year: u32) -> Self {
        Self {
            emotion: emotion.into(),
            source,
            year,
            tags: BTreeSet::new(),
            importance: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }
}

/// Inputs of one retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RetrievalQuery<'a> {
    pub year: u32,
    pub query: Option<&'a str>,
    pub top_k: Option<usize>,
    pub boosters: Option<&'a HashMap<String, f64>>,
    pub world_state: Option<&'a HashMap<String, AttrValue>>,
}

impl<'a> RetrievalQuery<'a> {
    pub fn for_year(year: u32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_boosters(mut self, boosters: &'a HashMap<String, f64>) -> Self {
        self.boosters = Some(boosters);
        self
    }

    pub fn with_world_state(mut self, world_state: &'a HashMap<String, AttrValue>) -> Self {
        self.world_state = Some(world_state);
        self
    }
}

/// Serializable checkpoint of every agent store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    stores: HashMap<String, AgentMemoryStore>,
    next_seq: u64,
}

/// The memory engine. Owns every agent's store, the RNG used for
/// consolidation and the (possibly inert) surprise plugin.
pub struct MemoryEngine {
    config: MemoryConfig,
    agent_configs: HashMap<String, MemoryConfig>,
    stores: HashMap<String, AgentMemoryStore>,
    surprise: Box<dyn SurprisePlugin>,
    rng: StdRng,
    next_seq: u64,
}

impl MemoryEngine {
    pub fn new(config: MemoryConfig, seed: u64) -> Self {
        Self {
            config,
            agent_configs: HashMap::new(),
            stores: HashMap::new(),
            surprise: Box::new(NoSurprise),
            rng: StdRng::seed_from_u64(seed),
            next_seq: 0,
        }
    }

    pub fn with_surprise(mut self, plugin: Box<dyn SurprisePlugin>) -> Self {
        self.surprise = plugin;
        self
    }

    /// Per-agent configuration override (usually derived from the
    /// agent-type block of the registry).
    pub fn configure_agent(&mut self, agent_id: impl Into<String>, config: MemoryConfig) {
        self.agent_configs.insert(agent_id.into(), config);
    }

    fn config_for(&self, agent_id: &str) -> &MemoryConfig {
        self.agent_configs.get(agent_id).unwrap_or(&self.config)
    }

    /// Ingest one observation. Importance derives from the emotion and
    /// source factor tables unless the caller supplied it; items over
    /// the consolidation gate are probabilistically burned into the
    /// long-term tier.
    pub fn add(&mut self, agent_id: &str, content: impl Into<String>, meta: ObservationMeta) {
        let config = self.config_for(agent_id).clone();
        let importance = meta.importance.unwrap_or_else(|| {
            let emotion = config
                .emotion_weights
                .get(&meta.emotion)
                .copied()
                .unwrap_or(0.5);
            let source = config
                .source_weights
                .get(meta.source.as_str())
                .copied()
                .unwrap_or(1.0);
            emotion * source
        });
        let importance = importance.clamp(0.0, 1.0);

        let mut item = MemoryItem {
            agent_id: agent_id.to_string(),
            content: content.into(),
            importance,
            emotion: meta.emotion,
            source: meta.source,
            year: meta.year,
            tags: meta.tags,
            consolidated: false,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let burn = importance >= config.consolidation_gate
            && self.rng.r#gen::<f64>() < config.burn_probability;

        let store = self.stores.entry(agent_id.to_string()).or_default();
        if burn {
            item.consolidated = true;
            store.consolidate(&item);
            if let Some(capacity) = config.long_term_capacity {
                store.evict_long_term(capacity, config.decay_rate, meta.year);
            }
        }
        store.push_working(item, config.working_capacity);

        tracing::debug!(
            agent_id,
            importance,
            consolidated = burn,
            "memory ingested"
        );
    }

    /// Salience retrieval. Unknown agents yield an empty list; memory is
    /// not authoritative ground truth and never errors.
    pub fn retrieve(&mut self, agent_id: &str, query: &RetrievalQuery<'_>) -> Vec<String> {
        self.retrieve_items(agent_id, query)
            .into_iter()
            .map(|item| item.content)
            .collect()
    }

    pub fn retrieve_items(&mut self, agent_id: &str, query: &RetrievalQuery<'_>) -> Vec<MemoryItem> {
        let config = self.config_for(agent_id).clone();

        // Arousal is observed before touching the store so the plugin
        // trace reflects every retrieval, known agent or not.
        let (dynamic_k, surprise_active) = self.observe_arousal(&config, query);

        let Some(store) = self.stores.get(agent_id) else {
            return Vec::new();
        };

        let top_k = query.top_k.or(dynamic_k).unwrap_or(config.working_capacity);

        let mut ranked = match config.mode {
            RankingMode::Basic => Self::rank_basic(store, &config, query, top_k),
            RankingMode::Weighted => Self::rank_weighted(store, &config, query, top_k),
        };

        if surprise_active && config.supplemental_top_k > 0 {
            Self::append_supplemental(store, &config, query, &mut ranked);
        }

        ranked
    }

    fn observe_arousal(
        &mut self,
        config: &MemoryConfig,
        query: &RetrievalQuery<'_>,
    ) -> (Option<usize>, bool) {
        if !self.surprise.is_active() {
            return (None, false);
        }
        // Dynamic sizing needs a world snapshot to react to.
        let Some(world_state) = query.world_state else {
            return (None, false);
        };
        let surprise = self.surprise.observe(world_state);
        let system = if surprise > config.arousal_threshold {
            CognitiveSystem::System2
        } else {
            CognitiveSystem::System1
        };
        let k = match system {
            CognitiveSystem::System1 => config.habitual_top_k,
            CognitiveSystem::System2 => config.alert_top_k,
        };
        tracing::debug!(surprise, alert = (system == CognitiveSystem::System2), "arousal observed");
        (Some(k), true)
    }

    fn rank_basic(
        store: &AgentMemoryStore,
        config: &MemoryConfig,
        query: &RetrievalQuery<'_>,
        top_k: usize,
    ) -> Vec<MemoryItem> {
        let mut result: Vec<MemoryItem> = store.working().cloned().collect();
        let seen: HashSet<u64> = result.iter().map(|m| m.seq).collect();

        let mut long_term: Vec<&MemoryItem> = store
            .long_term()
            .filter(|m| !seen.contains(&m.seq))
            .collect();
        long_term.sort_by(|a, b| {
            b.decayed_importance(query.year, config.decay_rate)
                .total_cmp(&a.decayed_importance(query.year, config.decay_rate))
                .then(a.seq.cmp(&b.seq))
        });
        result.extend(long_term.into_iter().take(top_k).cloned());
        result
    }

    fn rank_weighted(
        store: &AgentMemoryStore,
        config: &MemoryConfig,
        query: &RetrievalQuery<'_>,
        top_k: usize,
    ) -> Vec<MemoryItem> {
        let mut candidates: Vec<&MemoryItem> = store.working().collect();
        let seen: HashSet<u64> = candidates.iter().map(|m| m.seq).collect();
        candidates.extend(store.long_term().filter(|m| !seen.contains(&m.seq)));

        let mut scored: Vec<(f64, &MemoryItem)> = candidates
            .iter()
            .map(|item| (Self::salience(item, &candidates, config, query), *item))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then(a.seq.cmp(&b.seq)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// `S = w_r·R + w_i·I + w_c·C + w_rel·Rel − w_int·Int`
    fn salience(
        item: &MemoryItem,
        candidates: &[&MemoryItem],
        config: &MemoryConfig,
        query: &RetrievalQuery<'_>,
    ) -> f64 {
        let weights = &config.weights;
        let age_factor = (-config.decay_rate * item.age(query.year)).exp();

        let recency = age_factor;
        let importance = item.importance * age_factor;

        let context = query
            .boosters
            .map(|boosters| {
                boosters
                    .iter()
                    .filter(|(tag, _)| item_matches_tag(item, tag))
                    .map(|(_, weight)| *weight)
                    .fold(0.0f64, f64::max)
                    .min(1.0)
            })
            .unwrap_or(0.0);

        let relevance = match query.query {
            Some(text) if weights.relevance > 0.0 => overlap_coefficient(text, &item.content),
            _ => 0.0,
        };

        let interference = if weights.interference > 0.0 {
            candidates
                .iter()
                .filter(|other| other.seq > item.seq)
                .map(|other| overlap_coefficient(&item.content, &other.content))
                .fold(0.0f64, f64::max)
                .min(config.interference_cap)
        } else {
            0.0
        };

        weights.recency * recency
            + weights.importance * importance
            + weights.context * context
            + weights.relevance * relevance
            - weights.interference * interference
    }

    fn append_supplemental(
        store: &AgentMemoryStore,
        config: &MemoryConfig,
        query: &RetrievalQuery<'_>,
        result: &mut Vec<MemoryItem>,
    ) {
        let seen: HashSet<u64> = result.iter().map(|m| m.seq).collect();
        let mut extras: Vec<&MemoryItem> = store
            .long_term()
            .filter(|m| !seen.contains(&m.seq))
            .collect();
        extras.sort_by(|a, b| {
            b.decayed_importance(query.year, config.decay_rate)
                .total_cmp(&a.decayed_importance(query.year, config.decay_rate))
                .then(a.seq.cmp(&b.seq))
        });
        result.extend(extras.into_iter().take(config.supplemental_top_k).cloned());
    }

    pub fn clear(&mut self, agent_id: &str) {
        self.stores.remove(agent_id);
    }

    pub fn store(&self, agent_id: &str) -> Option<&AgentMemoryStore> {
        self.stores.get(agent_id)
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            stores: self.stores.clone(),
            next_seq: self.next_seq,
        }
    }

    pub fn restore(&mut self, snapshot: MemorySnapshot) {
        self.stores = snapshot.stores;
        self.next_seq = snapshot.next_seq;
    }

    pub fn reset_surprise(&mut self) {
        self.surprise.reset();
    }
}

fn item_matches_tag(item: &MemoryItem, tag: &str) -> bool {
    let tag = tag.to_lowercase();
    item.tags.iter().any(|t| t.to_lowercase() == tag)
        || tokenize(&item.content).contains(&tag)
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Overlap coefficient of the two keyword sets:
/// `|A ∩ B| / min(|A|, |B|)`.
fn overlap_coefficient(a: &str, b: &str) -> f64 {
    let set_a = tokenize(a);
    let set_b = tokenize(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    intersection / set_a.len().min(set_b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine(year: u32) -> ObservationMeta {
        ObservationMeta::new("routine", MemorySource::Personal, year)
    }

    fn engine() -> MemoryEngine {
        MemoryEngine::new(MemoryConfig::default(), 7)
    }

    #[test]
    fn test_unknown_agent_is_silent() {
        let mut engine = engine();
        let result = engine.retrieve("ghost", &RetrievalQuery::for_year(0));
        assert!(result.is_empty());
    }

    #[test]
    fn test_importance_derivation() {
        let mut engine = engine();
        engine.add(
            "a1",
            "saw a neighbor flooded",
            ObservationMeta::new("major", MemorySource::Neighbor, 0),
        );
        let item = engine.store("a1").unwrap().working().next().unwrap();
        assert!((item.importance - 0.9 * 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_consolidation_gate_blocks_low_importance() {
        let mut engine = engine();
        for i in 0..20 {
            engine.add("a1", format!("routine {}", i), routine(0));
        }
        // routine × personal = 0.1, below the 0.6 gate: nothing burned.
        assert_eq!(engine.store("a1").unwrap().long_term_len(), 0);
        assert_eq!(engine.store("a1").unwrap().working_len(), 5);
    }

    #[test]
    fn test_consolidation_burns_most_high_importance_items() {
        let mut engine = engine();
        for i in 0..50 {
            engine.add(
                "a1",
                format!("flood {}", i),
                ObservationMeta::new("critical", MemorySource::Personal, 0),
            );
        }
        let burned = engine.store("a1").unwrap().long_term_len();
        // P_burn = 0.8 over 50 trials; exact count is seed-dependent but
        // the gate clearly fires.
        assert!(burned > 30, "only {} items consolidated", burned);
        assert!(burned < 50);
    }

    #[test]
    fn test_salience_beats_recency() {
        // Fresh routine items vs one old flood memory with a matching
        // booster. Burn probability 1.0 keeps the consolidation step out
        // of the picture.
        let mut config = MemoryConfig::default();
        config.burn_probability = 1.0;
        let mut engine = MemoryEngine::new(config, 7);
        engine.add(
            "a1",
            "flood",
            ObservationMeta::new("critical", MemorySource::Personal, 0).with_importance(1.0),
        );
        // Push the flood item out of working with routine filler.
        for i in 0..5 {
            engine.add("a1", format!("routine day {}", i), routine(10));
        }
        assert!(
            engine
                .store("a1")
                .unwrap()
                .long_term()
                .any(|m| m.content == "flood"),
            "flood memory must have been consolidated"
        );

        let boosters = HashMap::from([("flood".to_string(), 1.0)]);
        let query = RetrievalQuery::for_year(10)
            .with_top_k(2)
            .with_boosters(&boosters);
        let result = engine.retrieve("a1", &query);

        assert_eq!(result.len(), 2);
        assert!(result.contains(&"flood".to_string()), "got {:?}", result);
    }

    #[test]
    fn test_retrieval_is_deterministic() {
        let build = || {
            let mut engine = MemoryEngine::new(MemoryConfig::default(), 42);
            for i in 0..10 {
                engine.add("a1", format!("event {}", i), routine(i));
            }
            engine.retrieve("a1", &RetrievalQuery::for_year(10).with_top_k(4))
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_tie_broken_by_creation_order() {
        let mut engine = engine();
        engine.add("a1", "first", routine(0));
        engine.add("a1", "second", routine(0));

        let result = engine.retrieve("a1", &RetrievalQuery::for_year(0).with_top_k(2));
        assert_eq!(result, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_basic_mode_window_plus_long_term() {
        let mut config = MemoryConfig::default();
        config.mode = RankingMode::Basic;
        config.burn_probability = 1.0;
        let mut engine = MemoryEngine::new(config, 3);

        engine.add(
            "a1",
            "old flood",
            ObservationMeta::new("critical", MemorySource::Personal, 0).with_importance(1.0),
        );
        for i in 0..6 {
            engine.add("a1", format!("routine {}", i), routine(5));
        }

        let result = engine.retrieve("a1", &RetrievalQuery::for_year(5).with_top_k(3));
        // Whole working window first, then long-term by decayed importance.
        assert!(result.len() <= 5 + 3);
        assert!(result.contains(&"old flood".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut engine = engine();
        engine.add("a1", "something", routine(0));
        engine.clear("a1");
        assert!(engine.retrieve("a1", &RetrievalQuery::for_year(0)).is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_everything() {
        let mut engine = engine();
        engine.add(
            "a1",
            "flood year",
            ObservationMeta::new("critical", MemorySource::Personal, 2)
                .with_tags(["flood", "damage"]),
        );
        engine.add("a2", "quiet year", routine(3));

        let snapshot = engine.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: MemorySnapshot = serde_json::from_str(&json).unwrap();

        let mut other = MemoryEngine::new(MemoryConfig::default(), 99);
        other.restore(restored);

        for agent in ["a1", "a2"] {
            let original = engine.store(agent).unwrap();
            let recovered = other.store(agent).unwrap();
            assert_eq!(original, recovered);
        }
    }

    struct ScriptedSurprise {
        values: Vec<f64>,
        index: usize,
        history: Vec<f64>,
    }

    impl SurprisePlugin for ScriptedSurprise {
        fn observe(&mut self, _world_state: &HashMap<String, AttrValue>) -> f64 {
            let value = self.values[self.index.min(self.values.len() - 1)];
            self.index += 1;
            self.history.push(value);
            value
        }

        fn cognitive_system(&self) -> CognitiveSystem {
            if self.history.last().copied().unwrap_or(0.0) > 0.5 {
                CognitiveSystem::System2
            } else {
                CognitiveSystem::System1
            }
        }

        fn reset(&mut self) {
            self.index = 0;
            self.history.clear();
        }

        fn trace(&self) -> &[f64] {
            &self.history
        }
    }

    #[test]
    fn test_dynamic_top_k_under_arousal() {
        let mut config = MemoryConfig::default();
        config.burn_probability = 1.0;
        let mut engine = MemoryEngine::new(config, 11).with_surprise(Box::new(
            ScriptedSurprise {
                values: vec![0.1, 0.9],
                index: 0,
                history: Vec::new(),
            },
        ));

        for i in 0..12 {
            engine.add(
                "a1",
                format!("event {}", i),
                ObservationMeta::new("critical", MemorySource::Personal, 0),
            );
        }

        let world = HashMap::from([("flood_depth".to_string(), AttrValue::Number(0.1))]);

        // Habitual: 5 ranked + 2 supplemental.
        let calm = engine.retrieve("a1", &RetrievalQuery::for_year(1).with_world_state(&world));
        assert_eq!(calm.len(), 5 + 2);

        // Alert: 7 ranked + 2 supplemental.
        let alert = engine.retrieve("a1", &RetrievalQuery::for_year(1).with_world_state(&world));
        assert_eq!(alert.len(), 7 + 2);
    }

    #[test]
    fn test_interference_penalizes_shadowed_memories() {
        let mut config = MemoryConfig::default();
        config.weights.interference = 1.0;
        config.weights.context = 0.0;
        let mut engine = MemoryEngine::new(config, 5);

        engine.add("a1", "levee broke by the river", routine(0));
        engine.add("a1", "levee broke by the river again", routine(0));
        engine.add("a1", "bought groceries", routine(0));

        let result = engine.retrieve("a1", &RetrievalQuery::for_year(0).with_top_k(3));
        // The first levee memory is fully shadowed by the newer duplicate
        // (capped at γ) and sinks to the bottom.
        assert_eq!(result.last().unwrap(), "levee broke by the river");
    }
}
