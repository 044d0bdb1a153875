use serde::{Deserialize, Serialize};

/// Severity of a validator finding. Ordered so reports can be ranked
/// highest-severity first when building retry feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Suggested correction attached to an intervention report.
///
/// Tier A carries nothing, tier B neutrally enumerates still-feasible
/// skills, tier C deliberately stays silent to preserve agent autonomy.
/// Directive phrasing ("you should choose X") is never produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Suggestion {
    None,
    Feasible { options: Vec<String> },
    Autonomy,
}

impl Suggestion {
    pub fn tier_label(&self) -> char {
        match self {
            Suggestion::None => 'A',
            Suggestion::Feasible { .. } => 'B',
            Suggestion::Autonomy => 'C',
        }
    }
}

/// One blocking (or observational) validator finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionReport {
    pub rule_id: String,
    pub blocked_skill: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Suggestion,
}

impl InterventionReport {
    pub fn error(
        rule_id: impl Into<String>,
        blocked_skill: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            blocked_skill: blocked_skill.into(),
            severity: Severity::Error,
            message: message.into(),
            suggestion: Suggestion::None,
        }
    }

    pub fn warning(
        rule_id: impl Into<String>,
        blocked_skill: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule_id, blocked_skill, message)
        }
    }

    pub fn info(
        rule_id: impl Into<String>,
        blocked_skill: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(rule_id, blocked_skill, message)
        }
    }

    pub fn with_feasible(mut self, options: Vec<String>) -> Self {
        self.suggestion = Suggestion::Feasible { options };
        self
    }

    pub fn with_autonomy(mut self) -> Self {
        self.suggestion = Suggestion::Autonomy;
        self
    }
}

/// Outcome of one validator against one proposal.
///
/// `valid` is true iff no ERROR-level report was produced. Warnings and
/// infos never block; infos are additionally kept out of retry feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<InterventionReport>,
    pub warnings: Vec<InterventionReport>,
    pub infos: Vec<InterventionReport>,
    /// Name of the validator that produced this result.
    pub source: String,
}

impl ValidationResult {
    pub fn pass(source: impl Into<String>) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            infos: Vec::new(),
            source: source.into(),
        }
    }

    pub fn fail(source: impl Into<String>, report: InterventionReport) -> Self {
        let mut result = Self::pass(source);
        result.push(report);
        result
    }

    /// Route a report into the right bucket, downgrading `valid` on ERROR.
    pub fn push(&mut self, report: InterventionReport) {
        match report.severity {
            Severity::Error => {
                self.valid = false;
                self.errors.push(report);
            }
            Severity::Warning => self.warnings.push(report),
            Severity::Info => self.infos.push(report),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.infos.is_empty()
    }
}
