use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use governance_core::{
    DecisionOutcome, ExecutionResult, InterventionReport, ValidationResult,
};

/// One LLM attempt within a decision: the raw reply, how it parsed and
/// what the council said.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub raw_reply: String,
    /// Parse-stage label, `None` when no stage could extract a decision.
    pub parse_stage: Option<String>,
    #[serde(default)]
    pub low_confidence_parse: bool,
    pub reports: Vec<InterventionReport>,
}

/// One logical audit row per decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub timestamp: DateTime<Utc>,
    pub year: u32,
    pub agent_id: String,
    pub agent_type: String,
    pub attempts: Vec<AttemptRecord>,
    /// Council results of the final attempt, in pipeline order.
    pub validation_results: Vec<ValidationResult>,
    pub approved_skill: String,
    pub outcome: DecisionOutcome,
    pub retry_count: u32,
    pub execution: ExecutionResult,
    pub duration_ms: u64,
}

impl DecisionRecord {
    pub fn new(year: u32, agent_id: impl Into<String>, agent_type: impl Into<String>) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            year,
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            attempts: Vec::new(),
            validation_results: Vec::new(),
            approved_skill: String::new(),
            outcome: DecisionOutcome::Approved,
            retry_count: 0,
            execution: ExecutionResult::ok(Default::default()),
            duration_ms: 0,
        }
    }

    pub fn warning_count(&self) -> usize {
        self.validation_results
            .iter()
            .map(|result| result.warnings.len())
            .sum()
    }

    pub fn intervention_count(&self) -> usize {
        self.attempts
            .iter()
            .flat_map(|attempt| attempt.reports.iter())
            .filter(|report| report.severity == governance_core::Severity::Error)
            .count()
    }
}
