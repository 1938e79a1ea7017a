//! Progress summaries
//!
//! A one-sentence description of what the agent is reading, for hosts that
//! poll a run while it is in flight.

use smith_core::{SessionState, PROMPT_CONTENT_CHARS};

use crate::{AgentError, PromptRegistry, SharedBackend, PROGRESS_PROMPT};

/// Shown while no body content has been extracted
pub const EXTRACTING_PLACEHOLDER: &str = "Extracting content...";

pub struct ProgressSummarizer {
    backend: SharedBackend,
    system_prompt: String,
}

impl ProgressSummarizer {
    pub fn new(backend: SharedBackend, prompts: &PromptRegistry) -> Result<Self, AgentError> {
        Ok(Self {
            backend,
            system_prompt: prompts.system(PROGRESS_PROMPT)?,
        })
    }

    /// Skips the oracle entirely while there is no body content
    pub async fn summarize(&self, state: &SessionState) -> Result<String, AgentError> {
        let Some(doc) = &state.body_content else {
            return Ok(EXTRACTING_PLACEHOLDER.to_string());
        };

        let input = format!("TITLE: {}\n\n{}", doc.title, doc.preview(PROMPT_CONTENT_CHARS));
        Ok(self.backend.generate(&self.system_prompt, &input).await?)
    }
}
