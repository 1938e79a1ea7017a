//! Errors from agent components

use smith_core::CommandParseError;
use thiserror::Error;

use crate::LlmError;

/// Errors from agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// The oracle could not be reached or answered with nothing
    #[error("Oracle error: {0}")]
    Llm(#[from] LlmError),

    /// The verdict does not call for an action
    #[error("No action needed for a '{0}' verdict")]
    NoAction(&'static str),

    /// The oracle's reply did not contain a usable command
    #[error("Invalid command: {0}")]
    Command(#[from] CommandParseError),

    #[error("No prompt template with id '{0}'")]
    MissingPrompt(String),
}
