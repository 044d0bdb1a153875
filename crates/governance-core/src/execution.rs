use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::AttrValue;

/// Result of handing an approved skill to the external simulation.
///
/// Fields are private so the invariant "failure carries no state changes"
/// holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    success: bool,
    state_changes: HashMap<String, AttrValue>,
    error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(state_changes: HashMap<String, AttrValue>) -> Self {
        Self {
            success: true,
            state_changes,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            state_changes: HashMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn state_changes(&self) -> &HashMap<String, AttrValue> {
        &self.state_changes
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
