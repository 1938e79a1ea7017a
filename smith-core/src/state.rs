//! Session state and the documents it carries
//!
//! The state is the agent's current view of the world:
//! - where the browser is
//! - what the last page looked like (markup, headlines, body)
//! - what went wrong last time an action ran

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the agent was asked to collect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Natural-language description of the data to collect
    pub objective: String,
}

impl TaskSpec {
    pub fn new(objective: &str) -> Self {
        Self {
            objective: objective.trim().to_string(),
        }
    }
}

/// Result of a deep extraction pass over one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Page the content came from
    pub url: String,
    /// Page heading (or the repository URL for repository pages)
    pub title: String,
    /// Newline-joined substantive content
    pub main_text: String,
    /// When the extraction happened
    pub extracted_at: DateTime<Utc>,
}

impl Document {
    /// Build a document stamped with the current time
    pub fn new(url: &str, title: &str, main_text: String) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            main_text,
            extracted_at: Utc::now(),
        }
    }

    /// Character count of the main text
    pub fn char_count(&self) -> usize {
        self.main_text.chars().count()
    }

    /// A short preview of the main text for prompts and logs
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.main_text.chars().take(max_chars).collect();
        if self.char_count() > max_chars {
            preview.push_str("...(truncated)");
        }
        preview
    }
}

/// The agent's current observation of the world.
///
/// Owned by exactly one agent run. Other components borrow it; only the
/// content extractor writes to it outside the loop (`current_url` during
/// headline extraction).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// URL of the page last observed
    pub current_url: Option<String>,
    /// Raw page source at the time of the last observation
    pub page_markup: Option<String>,
    /// Headline pass over the last page
    pub headlines: Option<Vec<String>>,
    /// Most recent deep extraction result
    pub body_content: Option<Document>,
    /// Text of the most recent action failure
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action failure. Earlier errors are replaced, never cleared.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// The URL as shown in prompts
    pub fn url_or_unknown(&self) -> &str {
        self.current_url.as_deref().unwrap_or("unknown")
    }

    /// Headlines rendered as a bracketed list for prompts
    pub fn headlines_text(&self) -> String {
        match &self.headlines {
            Some(headlines) => format!(
                "[{}]",
                headlines
                    .iter()
                    .map(|h| format!("\"{}\"", h.trim()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => "none".to_string(),
        }
    }

    /// Text of the last error for prompts
    pub fn last_error_text(&self) -> &str {
        self.last_error.as_deref().unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_spec_trims() {
        let task = TaskSpec::new("  collect the intro to Rust  ");
        assert_eq!(task.objective, "collect the intro to Rust");
    }

    #[test]
    fn test_record_error_replaces() {
        let mut state = SessionState::new();
        assert_eq!(state.last_error_text(), "none");

        state.record_error("element not found");
        state.record_error("navigation timed out");
        assert_eq!(state.last_error.as_deref(), Some("navigation timed out"));
    }

    #[test]
    fn test_headlines_text() {
        let mut state = SessionState::new();
        assert_eq!(state.headlines_text(), "none");

        state.headlines = Some(vec!["History ".to_string(), "Features".to_string()]);
        assert_eq!(state.headlines_text(), "[\"History\", \"Features\"]");
    }

    #[test]
    fn test_document_preview() {
        let doc = Document::new("https://a.example", "A", "abcdefghij".to_string());
        assert_eq!(doc.char_count(), 10);
        assert_eq!(doc.preview(20), "abcdefghij");
        assert_eq!(doc.preview(4), "abcd...(truncated)");
    }
}
