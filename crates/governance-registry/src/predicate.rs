use evalexpr::{ContextWithMutableVariables, HashMapContext, Node, Value};

use governance_core::{AgentState, AttrValue, GovernanceError, Result};

/// Compile a predicate expression, failing loudly so bad registry entries
/// die at startup instead of at decision time.
pub fn compile(expr: &str) -> Result<Node> {
    evalexpr::build_operator_tree(expr).map_err(|e| {
        GovernanceError::Config(format!("predicate '{}' does not compile: {}", expr, e))
    })
}

/// Evaluate a compiled predicate over agent state. Attributes map to
/// evalexpr variables by name; a reference to a missing attribute makes
/// the predicate false rather than aborting the decision.
pub fn evaluate(node: &Node, state: &AgentState) -> bool {
    let mut context = HashMapContext::new();
    for (key, value) in state.iter() {
        let converted = match value {
            AttrValue::Bool(b) => Value::Boolean(*b),
            AttrValue::Number(n) => Value::Float(*n),
            AttrValue::Text(s) => Value::String(s.clone()),
        };
        if context.set_value(key.clone(), converted).is_err() {
            return false;
        }
    }

    match node.eval_boolean_with_context(&context) {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!(error = %e, "predicate evaluation failed, treating as false");
            false
        }
    }
}
