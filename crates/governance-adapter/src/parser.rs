use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use governance_core::{DynamicSkillMap, ProposalError, SkillProposal};

use crate::config::AdapterConfig;
use crate::outcome::{ParseOutcome, ParseStage};
use crate::repair;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parse stage could extract a decision")]
    Exhausted,

    #[error("decision id '{0}' is not in the current option map")]
    UnknownOption(String),

    #[error(transparent)]
    Invariant(#[from] ProposalError),
}

/// A successfully parsed reply plus the record of how it was recovered.
#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub proposal: SkillProposal,
    pub outcome: ParseOutcome,
}

/// Multi-layer defensive parser. Stateless apart from configuration, so
/// one adapter serves every agent.
pub struct ModelAdapter {
    config: AdapterConfig,
    digit_pattern: Regex,
}

impl ModelAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            digit_pattern: Regex::new(r"\b(\d+)\b").expect("static pattern"),
        }
    }

    /// Parse a raw reply against the option map the prompt offered.
    pub fn parse(
        &self,
        raw: &str,
        skill_map: &DynamicSkillMap,
    ) -> Result<ParsedReply, ParseError> {
        let mut outcome = ParseOutcome::default();

        // Stage 1: cut the reply down to the delimited decision block.
        let segment = match self.extract_delimited(raw) {
            Some(inner) => {
                outcome.record(ParseStage::DelimiterExtraction);
                inner
            }
            None => raw,
        };

        // Stages 2-4: structured parse, repairing if needed.
        let parsed = serde_json::from_str::<Value>(segment.trim()).ok().or_else(|| {
            let repaired = repair::repair(segment);
            let value = serde_json::from_str::<Value>(&repaired).ok();
            if value.is_some() {
                outcome.record(ParseStage::JsonRepair);
            }
            value
        });

        if let Some(Value::Object(object)) = parsed {
            match self.from_object(&object, skill_map, &mut outcome) {
                Ok(proposal) => return Ok(ParsedReply { proposal, outcome }),
                Err(error) => {
                    tracing::debug!(%error, "structured parse unusable, falling through");
                }
            }
        }

        // Stage 5: bare skill names anywhere in the reply.
        if let Some(name) = self.keyword_scan(raw, skill_map) {
            outcome.record(ParseStage::KeywordScan);
            let proposal = SkillProposal::new(name)?;
            return Ok(ParsedReply { proposal, outcome });
        }

        // Stage 6: first standalone digit that is a valid option id.
        if let Some(name) = self.digit_scan(raw, skill_map) {
            outcome.record(ParseStage::DigitFallback);
            let proposal = SkillProposal::new(name)?;
            return Ok(ParsedReply { proposal, outcome });
        }

        Err(ParseError::Exhausted)
    }

    fn extract_delimited<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let start = raw.find(&self.config.start_delimiter)?;
        let after_start = start + self.config.start_delimiter.len();
        let end = raw[after_start..].find(&self.config.end_delimiter)?;
        Some(&raw[after_start..after_start + end])
    }

    fn from_object(
        &self,
        object: &serde_json::Map<String, Value>,
        skill_map: &DynamicSkillMap,
        outcome: &mut ParseOutcome,
    ) -> Result<SkillProposal, ParseError> {
        let decision = self
            .take_synonym(object, &self.config.decision_keys, outcome)
            .ok_or(ParseError::Exhausted)?;
        let skill_name = self.resolve_decision(&decision, skill_map, outcome)?;

        let mut proposal = SkillProposal::new(skill_name)?;

        if let Some(secondary) = self.take_synonym(object, &self.config.secondary_keys, outcome) {
            let name = self.resolve_decision(&secondary, skill_map, outcome)?;
            proposal = proposal.with_secondary(name)?;
        }

        if let Some(value) = self.find_synonym(object, &self.config.magnitude_keys, outcome) {
            proposal.magnitude = value.as_f64().or_else(|| {
                value.as_str().and_then(|s| s.trim().parse::<f64>().ok())
            });
        }

        if let Some(value) = self.find_synonym(object, &self.config.rationale_keys, outcome) {
            proposal.rationale = value.as_str().map(str::to_string);
        }

        // Everything unclaimed is reasoning payload (appraisal constructs
        // and whatever else the domain asked for).
        let claimed: Vec<&Vec<String>> = vec![
            &self.config.decision_keys,
            &self.config.secondary_keys,
            &self.config.magnitude_keys,
            &self.config.rationale_keys,
        ];
        for (key, value) in object {
            let lowered = key.trim().to_lowercase();
            if claimed.iter().any(|keys| keys.contains(&lowered)) {
                continue;
            }
            proposal.reasoning.insert(lowered, value.clone());
        }

        Ok(proposal)
    }

    fn find_synonym<'a>(
        &self,
        object: &'a serde_json::Map<String, Value>,
        synonyms: &[String],
        outcome: &mut ParseOutcome,
    ) -> Option<&'a Value> {
        for (rank, candidate) in synonyms.iter().enumerate() {
            for (key, value) in object {
                if key.trim().to_lowercase() == *candidate {
                    if rank > 0 {
                        outcome.record(ParseStage::KeyNormalization);
                    }
                    return Some(value);
                }
            }
        }
        None
    }

    fn take_synonym(
        &self,
        object: &serde_json::Map<String, Value>,
        synonyms: &[String],
        outcome: &mut ParseOutcome,
    ) -> Option<Value> {
        self.find_synonym(object, synonyms, outcome).cloned()
    }

    fn resolve_decision(
        &self,
        decision: &Value,
        skill_map: &DynamicSkillMap,
        outcome: &mut ParseOutcome,
    ) -> Result<String, ParseError> {
        match decision {
            Value::String(text) => {
                let trimmed = text.trim();
                // Numeric strings go through the option map too.
                if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
                    outcome.record(ParseStage::NumericMapping);
                    return skill_map
                        .get(trimmed)
                        .cloned()
                        .ok_or_else(|| ParseError::UnknownOption(trimmed.to_string()));
                }
                Ok(trimmed.to_string())
            }
            Value::Number(number) => {
                outcome.record(ParseStage::NumericMapping);
                let id = number.to_string();
                skill_map
                    .get(&id)
                    .cloned()
                    .ok_or(ParseError::UnknownOption(id))
            }
            other => Err(ParseError::UnknownOption(other.to_string())),
        }
    }

    fn keyword_scan(&self, raw: &str, skill_map: &DynamicSkillMap) -> Option<String> {
        let lowered = raw.to_lowercase();
        let mut best: Option<(usize, usize, &str)> = None;

        for name in skill_map.values() {
            for needle in [name.to_lowercase(), name.to_lowercase().replace('_', " ")] {
                if let Some(position) = find_word(&lowered, &needle) {
                    let candidate = (position, usize::MAX - needle.len(), name.as_str());
                    // Earliest match wins; ties go to the longer name.
                    if best.map(|b| candidate < b).unwrap_or(true) {
                        best = Some(candidate);
                    }
                }
            }
        }
        best.map(|(_, _, name)| name.to_string())
    }

    fn digit_scan(&self, raw: &str, skill_map: &DynamicSkillMap) -> Option<String> {
        for capture in self.digit_pattern.captures_iter(raw) {
            let id = &capture[1];
            if let Some(name) = skill_map.get(id) {
                return Some(name.clone());
            }
        }
        None
    }
}

impl Default for ModelAdapter {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(relative) = haystack[from..].find(needle) {
        let position = from + relative;
        let before_ok = position == 0
            || !haystack[..position]
                .chars()
                .next_back()
                .map(|c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false);
        let end = position + needle.len();
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .map(|c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false);
        if before_ok && after_ok {
            return Some(position);
        }
        from = position + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skill_map() -> DynamicSkillMap {
        DynamicSkillMap::from([
            ("1".to_string(), "do_nothing".to_string()),
            ("2".to_string(), "elevate_house".to_string()),
            ("3".to_string(), "buy_insurance".to_string()),
        ])
    }

    fn adapter() -> ModelAdapter {
        ModelAdapter::default()
    }

    #[test]
    fn test_clean_delimited_json() {
        let raw = r#"Thinking aloud first.
<<<DECISION_START>>>{"decision": "elevate_house", "tp": "H", "cp": "VH"}<<<DECISION_END>>>
Some trailing chatter."#;

        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "elevate_house");
        assert_eq!(reply.proposal.reasoning["tp"], json!("H"));
        assert!(reply.outcome.used(ParseStage::DelimiterExtraction));
        assert!(!reply.outcome.low_confidence());
    }

    #[test]
    fn test_repair_plus_numeric_mapping() {
        let raw = r#"{"decision": 2, "tp": "H",}"#;

        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "elevate_house");
        assert!(reply.outcome.used(ParseStage::JsonRepair));
        assert!(reply.outcome.used(ParseStage::NumericMapping));
        assert!(!reply.outcome.low_confidence());
    }

    #[test]
    fn test_key_synonym_normalization() {
        let raw = r#"{"choice": "buy_insurance"}"#;

        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "buy_insurance");
        assert!(reply.outcome.used(ParseStage::KeyNormalization));
    }

    #[test]
    fn test_numeric_string_decision() {
        let raw = r#"{"decision": "3"}"#;
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "buy_insurance");
        assert!(reply.outcome.used(ParseStage::NumericMapping));
    }

    #[test]
    fn test_keyword_scan_fallback() {
        let raw = "After weighing the options I will buy insurance this year.";
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "buy_insurance");
        assert!(reply.outcome.used(ParseStage::KeywordScan));
        assert!(reply.outcome.low_confidence());
    }

    #[test]
    fn test_digit_fallback() {
        let raw = "I pick option 2 because the water keeps rising.";
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "elevate_house");
        assert!(reply.outcome.used(ParseStage::DigitFallback));
        assert!(reply.outcome.low_confidence());
    }

    #[test]
    fn test_digit_not_in_map_skipped() {
        let raw = "Probability is 90 percent so option 2.";
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        // 90 is not an option id; the scan keeps going to 2.
        assert_eq!(reply.proposal.skill_name, "elevate_house");
    }

    #[test]
    fn test_exhausted() {
        let raw = "The weather is lovely and nothing else matters.";
        let result = adapter().parse(raw, &skill_map());
        assert!(matches!(result, Err(ParseError::Exhausted)));
    }

    #[test]
    fn test_secondary_decision() {
        let raw = r#"{"decision": "elevate_house", "secondary": "buy_insurance"}"#;
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(
            reply.proposal.secondary_skill_name.as_deref(),
            Some("buy_insurance")
        );
    }

    #[test]
    fn test_magnitude_and_rationale() {
        let raw = r#"{"decision": "elevate_house", "magnitude": 1.5, "reason": "deep water"}"#;
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.magnitude, Some(1.5));
        assert_eq!(reply.proposal.rationale.as_deref(), Some("deep water"));
        // Claimed keys do not leak into the reasoning payload.
        assert!(reply.proposal.reasoning.is_empty());
    }

    #[test]
    fn test_unknown_numeric_option_falls_through() {
        // Option 9 does not exist; stage 4 fails but stage 5 finds the
        // bare skill name.
        let raw = r#"{"decision": 9} ... elevate_house it is"#;
        let reply = adapter().parse(raw, &skill_map()).unwrap();
        assert_eq!(reply.proposal.skill_name, "elevate_house");
        assert!(reply.outcome.used(ParseStage::KeywordScan));
    }
}
