use std::collections::HashMap;

use crate::proposal::DecisionReport;
use crate::state::{AgentProfile, AttrValue};

/// Caller-provided lifecycle callbacks invoked by the broker at documented
/// points. All methods default to no-ops.
pub trait LifecycleHooks: Send + Sync {
    fn pre_year(&self, _year: u32, _env: &HashMap<String, AttrValue>, _agents: &[AgentProfile]) {}

    fn post_step(&self, _agent: &AgentProfile, _report: &DecisionReport) {}

    fn post_year(&self, _year: u32, _agents: &[AgentProfile]) {}
}

/// Explicit "no hooks" implementation.
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}
