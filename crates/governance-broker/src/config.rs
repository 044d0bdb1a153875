use serde::{Deserialize, Serialize};

/// Prompt used when the caller does not install a domain template. The
/// variable names are part of the public contract.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are agent {{ agent_id }} making your decision for year {{ year }}.

Your situation:
{% for key, value in personal|items %}- {{ key }}: {{ value }}
{% endfor %}
Around you:
{% for key, value in local|items %}- {{ key }}: {{ value }}
{% endfor %}
{% for key, value in global|items %}- {{ key }}: {{ value }}
{% endfor %}
You remember:
{% for line in memory %}- {{ line }}
{% endfor %}
{{ criteria_definitions | default('') }}
Rate each criterion on the scale {{ rating_scale | default('VL, L, M, H, VH') }}.

Your options:
{{ options_text }}

Reply between <<<DECISION_START>>> and <<<DECISION_END>>> as:
{{ response_format | default('{\"decision\": <option id>}') }}";

fn default_max_retries() -> u32 {
    3
}

fn default_max_reports_per_retry() -> usize {
    3
}

fn default_ingest_observations() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Retries after the initial attempt; LLM calls per decision never
    /// exceed `1 + max_retries`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Reports injected into one retry prompt.
    #[serde(default = "default_max_reports_per_retry")]
    pub max_reports_per_retry: usize,

    /// Store a consolidated observation after each decision.
    #[serde(default = "default_ingest_observations")]
    pub ingest_observations: bool,

    /// Environment flags that mark a year as critical for observation
    /// ingestion (e.g. `flood_event`).
    #[serde(default)]
    pub alert_signals: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_reports_per_retry: default_max_reports_per_retry(),
            ingest_observations: default_ingest_observations(),
            alert_signals: Vec::new(),
        }
    }
}
