use thiserror::Error;

/// Top-level error for the governance middleware.
///
/// Validator outcomes are never surfaced through this type; a blocked
/// proposal is data (`ValidationResult`), not a fault. `GovernanceError`
/// covers infrastructure and configuration problems only.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Fatal at startup: bad registry, colliding context keys, missing
    /// fallback skill and the like.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("audit error: {0}")]
    Audit(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
