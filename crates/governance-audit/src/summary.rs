use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use governance_core::{DecisionOutcome, Severity};

use crate::record::DecisionRecord;

/// Aggregated end-of-run counters. Histogram keys are rule ids, ordered
/// (BTreeMap) so the summary file is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub decisions: u64,
    pub approved: u64,
    pub rejected: u64,
    /// Decisions approved only after at least one retry.
    pub retry_successes: u64,
    pub interventions: u64,
    pub warnings: u64,
    pub execution_failures: u64,
    pub error_rules: BTreeMap<String, u64>,
    pub warning_rules: BTreeMap<String, u64>,
    pub parse_stages: BTreeMap<String, u64>,
}

impl RunSummary {
    pub fn absorb(&mut self, record: &DecisionRecord) {
        self.decisions += 1;
        match record.outcome {
            DecisionOutcome::Approved => {
                self.approved += 1;
                if record.retry_count > 0 {
                    self.retry_successes += 1;
                }
            }
            DecisionOutcome::Rejected => self.rejected += 1,
        }
        if !record.execution.success() {
            self.execution_failures += 1;
        }

        for attempt in &record.attempts {
            if let Some(stage) = &attempt.parse_stage {
                *self.parse_stages.entry(stage.clone()).or_insert(0) += 1;
            }
            for report in &attempt.reports {
                match report.severity {
                    Severity::Error => {
                        self.interventions += 1;
                        *self.error_rules.entry(report.rule_id.clone()).or_insert(0) += 1;
                    }
                    Severity::Warning => {}
                    Severity::Info => {}
                }
            }
        }

        // Warnings are counted from the final council results so one
        // observation is not double-counted across retries.
        for result in &record.validation_results {
            for report in &result.warnings {
                self.warnings += 1;
                *self
                    .warning_rules
                    .entry(report.rule_id.clone())
                    .or_insert(0) += 1;
            }
        }
    }
}
