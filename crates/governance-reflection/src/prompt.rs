use std::collections::HashMap;

use regex::Regex;

/// Compose the batch prompt. Each agent's memories are labeled by id so
/// the reply can be split back apart.
pub fn build_batch_prompt(batch: &[(String, Vec<String>)], year: u32) -> String {
    let mut prompt = format!(
        "It is the end of year {}. Summarize what each agent below has \
         learned from its experiences, in one sentence per agent.\n\n",
        year
    );
    for (agent_id, memories) in batch {
        prompt.push_str(&format!("AGENT {}:\n", agent_id));
        for memory in memories {
            prompt.push_str(&format!("- {}\n", memory));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "Reply with exactly one line per agent, formatted as:\nAGENT <id>: <one-sentence insight>",
    );
    prompt
}

/// Split a batch reply back into per-agent summaries. Lines that do not
/// match the `AGENT <id>: …` shape, or that name an unknown agent, are
/// ignored; the first line per agent wins.
pub fn parse_batch_response(text: &str, agent_ids: &[String]) -> HashMap<String, String> {
    let pattern = Regex::new(r"(?m)^\s*AGENT\s+(\S+?)\s*:\s*(.+)$").expect("static pattern");
    let mut summaries = HashMap::new();
    for capture in pattern.captures_iter(text) {
        let id = capture[1].to_string();
        if !agent_ids.contains(&id) {
            continue;
        }
        let summary = capture[2].trim().to_string();
        if summary.is_empty() {
            continue;
        }
        summaries.entry(id).or_insert(summary);
    }
    summaries
}
