use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    #[error("empty reply")]
    EmptyReply,
}

/// One raw model reply plus whatever metadata the adapter chose to keep
/// (token counts, provider ids). The core never interprets the metadata.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub metadata: Option<Value>,
}

impl LlmReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Pluggable model invocation. Adapters own their own timeout policy; a
/// timeout surfaces to the broker as an error, which it accounts as a
/// parse failure for retry purposes.
#[async_trait]
pub trait LlmInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<LlmReply, LlmError>;

    fn name(&self) -> &str;
}
