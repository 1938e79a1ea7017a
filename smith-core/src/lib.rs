//! Blacksmith Scout Core - data model for the oracle-guided browsing agent
//!
//! This crate provides the types every other crate shares:
//! - Task, session state and extracted documents
//! - Oracle verdicts and their prefix parser
//! - The closed browser command vocabulary
//! - Terminal run results
//! - Search engine registry (start page and relevance deny list)

pub mod state;
pub mod verdict;
pub mod command;
pub mod result;
pub mod search_engines;

pub use state::*;
pub use verdict::*;
pub use command::*;
pub use result::*;
pub use search_engines::*;

/// Default attempt budget for one run
pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;

/// Paragraphs kept by the generic article strategy
pub const ARTICLE_PARAGRAPH_LIMIT: usize = 3;

/// Characters of body text embedded in oracle prompts
pub const PROMPT_CONTENT_CHARS: usize = 6000;
