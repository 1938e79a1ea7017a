//! Browser control interface
//!
//! One implementation drives a real Chrome instance ([`crate::ChromeBrowser`]);
//! tests drive scripted fakes. The agent loop owns exactly one browser for the
//! lifetime of a run and closes it on every exit path.

use async_trait::async_trait;
use thiserror::Error;

use smith_core::BrowserCommand;

/// Errors from browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Failed to read page: {0}")]
    Read(String),

    #[error("Browser session is closed")]
    Closed,

    #[error("Browser task failed: {0}")]
    Task(String),
}

/// A single browser session
#[async_trait]
pub trait Browser: Send {
    /// Load a URL and wait for it to settle
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// URL of the page currently shown
    async fn current_url(&mut self) -> Result<String, BrowserError>;

    /// Full markup of the page currently shown
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// Execute one command from the closed vocabulary
    async fn execute(&mut self, command: &BrowserCommand) -> Result<(), BrowserError>;

    /// Release the session
    async fn close(&mut self) -> Result<(), BrowserError>;
}
