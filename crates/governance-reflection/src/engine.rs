use std::sync::Arc;

use serde::{Deserialize, Serialize};

use governance_core::AgentProfile;
use governance_llm::LlmInvoker;
use governance_memory::{MemoryEngine, MemorySource, ObservationMeta, RetrievalQuery};

use crate::prompt::{build_batch_prompt, parse_batch_response};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    /// Run every N years.
    #[serde(default = "default_cadence")]
    pub cadence: u32,

    /// Memories gathered per agent for the batch prompt.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Importance assigned to inserted insights so they outlive decay.
    #[serde(default = "default_insight_importance")]
    pub insight_importance: f64,

    /// Agents per LLM call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_cadence() -> u32 {
    1
}

fn default_top_k() -> usize {
    10
}

fn default_insight_importance() -> f64 {
    0.9
}

fn default_batch_size() -> usize {
    5
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            top_k: default_top_k(),
            insight_importance: default_insight_importance(),
            batch_size: default_batch_size(),
        }
    }
}

/// One consolidated insight, as inserted back into memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionInsight {
    pub agent_id: String,
    pub summary: String,
    pub source_count: usize,
    pub importance: f64,
    pub year: u32,
}

/// Periodic batch consolidation of episodic traces.
pub struct ReflectionEngine {
    invoker: Arc<dyn LlmInvoker>,
    config: ReflectionConfig,
}

impl ReflectionEngine {
    pub fn new(invoker: Arc<dyn LlmInvoker>, config: ReflectionConfig) -> Self {
        Self { invoker, config }
    }

    pub fn due(&self, year: u32) -> bool {
        self.config.cadence > 0 && year % self.config.cadence == 0
    }

    /// Run one reflection cycle over all agents. A failing batch is
    /// logged and skipped; insights from other batches are preserved.
    pub async fn run_cycle(
        &self,
        memory: &mut MemoryEngine,
        agents: &[AgentProfile],
        year: u32,
    ) -> Vec<ReflectionInsight> {
        let mut insights = Vec::new();

        for chunk in agents.chunks(self.config.batch_size.max(1)) {
            let mut batch: Vec<(String, Vec<String>)> = Vec::new();
            for agent in chunk {
                let query = RetrievalQuery::for_year(year).with_top_k(self.config.top_k);
                let memories = memory.retrieve(&agent.id, &query);
                if !memories.is_empty() {
                    batch.push((agent.id.clone(), memories));
                }
            }
            if batch.is_empty() {
                continue;
            }

            let prompt = build_batch_prompt(&batch, year);
            let reply = match self.invoker.invoke(&prompt).await {
                Ok(reply) => reply,
                Err(error) => {
                    tracing::warn!(%error, "reflection batch failed, skipping");
                    continue;
                }
            };

            let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
            let summaries = parse_batch_response(&reply.text, &ids);

            for (agent_id, memories) in &batch {
                let Some(summary) = summaries.get(agent_id) else {
                    tracing::debug!(agent_id, "no insight in batch reply");
                    continue;
                };
                let insight = ReflectionInsight {
                    agent_id: agent_id.clone(),
                    summary: summary.clone(),
                    source_count: memories.len(),
                    importance: self.config.insight_importance,
                    year,
                };
                memory.add(
                    agent_id,
                    summary.clone(),
                    ObservationMeta::new("insight", MemorySource::Reflection, year)
                        .with_importance(self.config.insight_importance)
                        .with_tags(["reflection"]),
                );
                insights.push(insight);
            }
        }

        tracing::debug!(count = insights.len(), year, "reflection cycle complete");
        insights
    }
}
