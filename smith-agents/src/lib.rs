//! Blacksmith Scout Agents
//!
//! The oracle-backed components of a browsing run:
//! - **Content extractor**: headline and body passes over observed pages
//! - **Relevance filter**: keeps search result pages out of the deep pass
//! - **Thinker**: asks the oracle whether the task is complete
//! - **Action synthesizer**: turns guidance into one browser command
//! - **Progress summarizer**: one-sentence status for polling hosts
//!
//! ## Prompt templates
//!
//! Oracle instructions live in TOML files under `prompts/`.
//! See [`prompts::PromptRegistry`] for loading and overriding them.

pub mod backend;
pub mod error;
pub mod prompts;
pub mod extractor;
pub mod relevance;
pub mod thinker;
pub mod actions;
pub mod summarizer;

pub use backend::*;
pub use error::*;
pub use prompts::*;
pub use extractor::*;
pub use relevance::*;
pub use thinker::*;
pub use actions::*;
pub use summarizer::*;
