//! Tiered context builder.
//!
//! Assembles the prompt payload for one decision: retrieved memories,
//! the filtered skill space with its numeric option map, verbalized
//! agent state layered into personal/local/global sections, and booster
//! hints derived from environment signals. The payload feeds a minijinja
//! template whose variables are part of the public contract.

pub mod builder;
pub mod config;
pub mod render;
pub mod verbalize;

pub use builder::{AssembledContext, ContextBuilder};
pub use config::{BoosterRule, ContextConfig, VerbalBin};
pub use render::TemplateRenderer;
