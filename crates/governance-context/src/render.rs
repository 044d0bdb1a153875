use std::collections::HashMap;

use minijinja::{Environment, Value as MJValue};
use serde_json::Value;

use governance_core::{GovernanceError, Result};

/// Thin minijinja wrapper. Payload keys are exposed as top-level
/// template variables; auto-escaping is off because the output is a
/// plain-text prompt, not markup.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        Self { env }
    }

    pub fn render(&self, template: &str, payload: &HashMap<String, Value>) -> Result<String> {
        let ctx: HashMap<&str, MJValue> = payload
            .iter()
            .map(|(key, value)| (key.as_str(), json_to_minijinja(value)))
            .collect();

        let tmpl = self
            .env
            .template_from_str(template)
            .map_err(|e| GovernanceError::Template(e.to_string()))?;

        tmpl.render(&ctx)
            .map_err(|e| GovernanceError::Template(e.to_string()))
    }
}

fn json_to_minijinja(value: &Value) -> MJValue {
    match value {
        Value::Null => MJValue::from(()),
        Value::Bool(b) => MJValue::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                MJValue::from(i)
            } else if let Some(u) = n.as_u64() {
                MJValue::from(u)
            } else if let Some(f) = n.as_f64() {
                MJValue::from(f)
            } else {
                MJValue::from(())
            }
        }
        Value::String(s) => MJValue::from(s.as_str()),
        Value::Array(arr) => {
            let items: Vec<MJValue> = arr.iter().map(json_to_minijinja).collect();
            MJValue::from(items)
        }
        Value::Object(obj) => {
            let map: std::collections::BTreeMap<String, MJValue> = obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_minijinja(v)))
                .collect();
            MJValue::from_iter(map)
        }
    }
}
