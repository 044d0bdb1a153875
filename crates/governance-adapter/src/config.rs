use serde::{Deserialize, Serialize};

fn default_start_delimiter() -> String {
    "<<<DECISION_START>>>".to_string()
}

fn default_end_delimiter() -> String {
    "<<<DECISION_END>>>".to_string()
}

fn default_decision_keys() -> Vec<String> {
    ["decision", "choice", "action", "skill", "selected_option"]
        .map(String::from)
        .to_vec()
}

fn default_secondary_keys() -> Vec<String> {
    ["secondary_decision", "secondary", "second_choice", "secondary_action"]
        .map(String::from)
        .to_vec()
}

fn default_magnitude_keys() -> Vec<String> {
    ["magnitude", "amount", "extent"].map(String::from).to_vec()
}

fn default_rationale_keys() -> Vec<String> {
    ["rationale", "reason", "justification", "explanation"]
        .map(String::from)
        .to_vec()
}

/// Per-domain parser configuration: decision delimiters and the synonym
/// lists used for key normalization. The first entry of each list is the
/// canonical key; the rest are accepted variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default = "default_start_delimiter")]
    pub start_delimiter: String,

    #[serde(default = "default_end_delimiter")]
    pub end_delimiter: String,

    #[serde(default = "default_decision_keys")]
    pub decision_keys: Vec<String>,

    #[serde(default = "default_secondary_keys")]
    pub secondary_keys: Vec<String>,

    #[serde(default = "default_magnitude_keys")]
    pub magnitude_keys: Vec<String>,

    #[serde(default = "default_rationale_keys")]
    pub rationale_keys: Vec<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            start_delimiter: default_start_delimiter(),
            end_delimiter: default_end_delimiter(),
            decision_keys: default_decision_keys(),
            secondary_keys: default_secondary_keys(),
            magnitude_keys: default_magnitude_keys(),
            rationale_keys: default_rationale_keys(),
        }
    }
}
