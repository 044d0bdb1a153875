use serde::{Deserialize, Serialize};

/// The parsing layers, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    DelimiterExtraction,
    JsonRepair,
    KeyNormalization,
    NumericMapping,
    KeywordScan,
    DigitFallback,
}

impl ParseStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStage::DelimiterExtraction => "delimiter_extraction",
            ParseStage::JsonRepair => "json_repair",
            ParseStage::KeyNormalization => "key_normalization",
            ParseStage::NumericMapping => "numeric_mapping",
            ParseStage::KeywordScan => "keyword_scan",
            ParseStage::DigitFallback => "digit_fallback",
        }
    }

    /// Stages that recover a decision without structure are flagged so
    /// the audit trail can surface them.
    pub fn is_low_fidelity(&self) -> bool {
        matches!(self, ParseStage::KeywordScan | ParseStage::DigitFallback)
    }
}

/// Which stages contributed to a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub stages: Vec<ParseStage>,
}

impl ParseOutcome {
    pub fn record(&mut self, stage: ParseStage) {
        if !self.stages.contains(&stage) {
            self.stages.push(stage);
        }
    }

    pub fn used(&self, stage: ParseStage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn low_confidence(&self) -> bool {
        self.stages.iter().any(ParseStage::is_low_fidelity)
    }

    /// Compact label for audit rows, e.g. `"json_repair+numeric_mapping"`.
    pub fn label(&self) -> String {
        if self.stages.is_empty() {
            return "strict".to_string();
        }
        self.stages
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}
