//! LLM invoker seam for the agent governance middleware.
//!
//! The broker treats the model as a pluggable blocking call; provider
//! choice, transport and timeout policy all live behind [`LlmInvoker`].

pub mod invoker;
pub mod mock;

pub use invoker::{LlmError, LlmInvoker, LlmReply};
pub use mock::MockInvoker;
