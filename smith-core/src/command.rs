//! Browser command vocabulary
//!
//! The action synthesizer returns an [`ActionCommand`]: raw oracle text with
//! formatting artifacts stripped. It is only ever executed after being parsed
//! into a [`BrowserCommand`], a small closed set of operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Upper bound for a single wait command
pub const MAX_WAIT_MS: u64 = 30_000;

fn default_wait_ms() -> u64 {
    2_000
}

/// Command spellings the oracle tends to produce that are not in the vocabulary,
/// paired with the spelling to use instead
pub const DEPRECATED_SPELLINGS: &[(&str, &str)] = &[
    ("goto", "navigate"),
    ("open_url", "navigate"),
    ("get", "navigate"),
    ("click_element", "click"),
    ("send_keys", "type"),
    ("fill", "type"),
    ("sleep", "wait"),
];

/// Errors turning oracle output into a command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Command is not a JSON object: {0}")]
    NotJson(String),

    #[error("Unknown or malformed command: {0}")]
    Malformed(String),

    #[error("Invalid command: {0}")]
    Invalid(String),
}

/// A single sanitized instruction from the action synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommand {
    raw: String,
}

impl ActionCommand {
    /// Strip code fences, language tags and stray backticks from oracle output
    pub fn sanitize(output: &str) -> Self {
        let mut cleaned = output.trim();

        if let Some(rest) = cleaned.strip_prefix("```") {
            // Drop the language tag on the fence line, if any
            cleaned = match rest.find('\n') {
                Some(newline) if !rest[..newline].trim_start().starts_with('{') => &rest[newline + 1..],
                _ => rest,
            };
        }

        cleaned = cleaned.trim().trim_end_matches("```").trim();
        cleaned = cleaned.trim_matches('`').trim();

        for tag in ["json", "python"] {
            if let Some(rest) = cleaned.strip_prefix(tag) {
                if rest.trim_start().starts_with('{') {
                    cleaned = rest.trim_start();
                }
            }
        }

        Self {
            raw: cleaned.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parse into the closed vocabulary, validating arguments
    pub fn parse(&self) -> Result<BrowserCommand, CommandParseError> {
        if self.raw.is_empty() {
            return Err(CommandParseError::Empty);
        }

        let start = self.raw.find('{');
        let end = self.raw.rfind('}');
        let object = match (start, end) {
            (Some(start), Some(end)) if start < end => &self.raw[start..=end],
            _ => return Err(CommandParseError::NotJson(self.raw.clone())),
        };

        let command: BrowserCommand = serde_json::from_str(object)
            .map_err(|e| CommandParseError::Malformed(format!("{} ({})", object, e)))?;

        command.validate()?;
        Ok(command)
    }
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Operations the browser control interface understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserCommand {
    /// Load a URL
    Navigate { url: String },
    /// Run a query on the default search engine
    Search { query: String },
    /// Click the first element matching a CSS selector
    Click { selector: String },
    /// Focus an element and type text into it
    Type { selector: String, text: String },
    /// Press a named key (e.g. "Enter")
    PressKey { key: String },
    /// Wait for an element, or just pause when no selector is given
    Wait {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default = "default_wait_ms")]
        timeout_ms: u64,
    },
    /// Go back in history
    Back,
}

impl BrowserCommand {
    fn validate(&self) -> Result<(), CommandParseError> {
        match self {
            BrowserCommand::Navigate { url } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(CommandParseError::Invalid(format!(
                        "navigate needs an absolute http(s) URL, got '{}'",
                        url
                    )));
                }
            }
            BrowserCommand::Search { query } if query.trim().is_empty() => {
                return Err(CommandParseError::Invalid("search query is empty".to_string()));
            }
            BrowserCommand::Click { selector } | BrowserCommand::Type { selector, .. }
                if selector.trim().is_empty() =>
            {
                return Err(CommandParseError::Invalid("selector is empty".to_string()));
            }
            BrowserCommand::PressKey { key } if key.trim().is_empty() => {
                return Err(CommandParseError::Invalid("key is empty".to_string()));
            }
            BrowserCommand::Wait { timeout_ms, .. } if *timeout_ms > MAX_WAIT_MS => {
                return Err(CommandParseError::Invalid(format!(
                    "wait of {}ms exceeds the {}ms limit",
                    timeout_ms, MAX_WAIT_MS
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for BrowserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserCommand::Navigate { url } => write!(f, "navigate {}", url),
            BrowserCommand::Search { query } => write!(f, "search \"{}\"", query),
            BrowserCommand::Click { selector } => write!(f, "click {}", selector),
            BrowserCommand::Type { selector, text } => write!(f, "type \"{}\" into {}", text, selector),
            BrowserCommand::PressKey { key } => write!(f, "press {}", key),
            BrowserCommand::Wait {
                selector: Some(selector),
                timeout_ms,
            } => write!(f, "wait up to {}ms for {}", timeout_ms, selector),
            BrowserCommand::Wait {
                selector: None,
                timeout_ms,
            } => write!(f, "wait {}ms", timeout_ms),
            BrowserCommand::Back => f.write_str("back"),
        }
    }
}
