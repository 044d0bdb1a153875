use std::collections::HashMap;

use crate::execution::ExecutionResult;
use crate::proposal::ApprovedSkill;
use crate::state::AttrValue;

/// Boundary to the external simulation.
///
/// The simulation executes approved skills and publishes a per-year
/// environment snapshot. It must not mutate agent state itself; the
/// broker applies the returned deltas.
pub trait SimulationEngine: Send + Sync {
    fn execute(&self, approved: &ApprovedSkill) -> ExecutionResult;

    fn environment(&self, year: u32) -> HashMap<String, AttrValue>;
}
