use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::invoker::{LlmError, LlmInvoker, LlmReply};

/// Scripted invoker for tests.
///
/// Replies are consumed in order; with cycling enabled the script wraps
/// around instead of running dry. Every prompt is recorded so tests can
/// assert on call counts and on what the broker actually sent.
#[derive(Clone)]
pub struct MockInvoker {
    name: String,
    inner: Arc<RwLock<MockInvokerInner>>,
}

struct MockInvokerInner {
    replies: Vec<String>,
    reply_index: usize,
    cycle: bool,
    prompts: Vec<String>,
    should_error: bool,
    error_message: String,
}

impl MockInvoker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(RwLock::new(MockInvokerInner {
                replies: Vec::new(),
                reply_index: 0,
                cycle: false,
                prompts: Vec::new(),
                should_error: false,
                error_message: "mock error".to_string(),
            })),
        }
    }

    pub fn with_replies(name: impl Into<String>, replies: Vec<String>) -> Self {
        let mock = Self::new(name);
        mock.set_replies(replies, false);
        mock
    }

    pub fn add_reply(&self, reply: impl Into<String>) {
        self.inner.write().replies.push(reply.into());
    }

    pub fn set_replies(&self, replies: Vec<String>, cycle: bool) {
        let mut inner = self.inner.write();
        inner.replies = replies;
        inner.reply_index = 0;
        inner.cycle = cycle;
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.should_error = true;
        inner.error_message = message.into();
    }

    pub fn clear_error(&self) {
        self.inner.write().should_error = false;
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().prompts.len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.inner.read().prompts.clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.inner.read().prompts.last().cloned()
    }
}

#[async_trait]
impl LlmInvoker for MockInvoker {
    async fn invoke(&self, prompt: &str) -> Result<LlmReply, LlmError> {
        let mut inner = self.inner.write();
        inner.prompts.push(prompt.to_string());

        if inner.should_error {
            return Err(LlmError::Provider(inner.error_message.clone()));
        }

        if inner.replies.is_empty() {
            return Err(LlmError::EmptyReply);
        }

        let index = if inner.reply_index < inner.replies.len() {
            inner.reply_index
        } else if inner.cycle {
            inner.reply_index % inner.replies.len()
        } else {
            // Script exhausted; keep returning the final reply.
            inner.replies.len() - 1
        };
        inner.reply_index += 1;

        Ok(LlmReply::new(inner.replies[index].clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let mock = MockInvoker::with_replies("test", vec!["one".into(), "two".into()]);

        assert_eq!(mock.invoke("p1").await.unwrap().text, "one");
        assert_eq!(mock.invoke("p2").await.unwrap().text, "two");
        // Exhausted: repeats the last reply.
        assert_eq!(mock.invoke("p3").await.unwrap().text, "two");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_cycling() {
        let mock = MockInvoker::new("test");
        mock.set_replies(vec!["a".into(), "b".into()], true);

        assert_eq!(mock.invoke("p").await.unwrap().text, "a");
        assert_eq!(mock.invoke("p").await.unwrap().text, "b");
        assert_eq!(mock.invoke("p").await.unwrap().text, "a");
    }

    #[tokio::test]
    async fn test_error_injection() {
        let mock = MockInvoker::with_replies("test", vec!["ok".into()]);
        mock.set_error("connection reset");

        assert!(mock.invoke("p").await.is_err());
        mock.clear_error();
        assert_eq!(mock.invoke("p").await.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn test_prompt_history() {
        let mock = MockInvoker::with_replies("test", vec!["ok".into()]);
        mock.invoke("first").await.unwrap();
        mock.invoke("second").await.unwrap();

        assert_eq!(mock.prompts(), vec!["first", "second"]);
        assert_eq!(mock.last_prompt().as_deref(), Some("second"));
    }
}
