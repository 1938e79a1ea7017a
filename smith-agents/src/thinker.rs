//! Decision oracle client
//!
//! Shows the oracle the task and what the agent has read so far, and turns the
//! reply into a [`Verdict`].

use tracing::{debug, info};

use smith_core::{SessionState, TaskSpec, Verdict, PROMPT_CONTENT_CHARS};

use crate::{AgentError, PromptRegistry, SharedBackend, THINKER_PROMPT};

/// Asks the oracle whether the task is complete
pub struct Thinker {
    backend: SharedBackend,
    system_prompt: String,
}

impl Thinker {
    pub fn new(backend: SharedBackend, prompts: &PromptRegistry) -> Result<Self, AgentError> {
        Ok(Self {
            backend,
            system_prompt: prompts.system(THINKER_PROMPT)?,
        })
    }

    /// One oracle call. Unrecognized replies come back as [`Verdict::Malformed`].
    pub async fn think(&self, state: &SessionState, task: &TaskSpec) -> Result<Verdict, AgentError> {
        let context = build_context(state, task);
        debug!("Thinker context: {} chars", context.len());

        let reply = self.backend.generate(&self.system_prompt, &context).await?;
        let verdict = Verdict::parse(&reply);

        info!("Verdict: {}", verdict.kind());
        Ok(verdict)
    }
}

fn build_context(state: &SessionState, task: &TaskSpec) -> String {
    let content = match &state.body_content {
        Some(doc) => format!(
            "TITLE: {}\n{}",
            doc.title,
            doc.preview(PROMPT_CONTENT_CHARS)
        ),
        None => "(no article content extracted yet)".to_string(),
    };

    format!(
        "TASK: {}\n\nCURRENT URL: {}\n\nPAGE HEADLINES: {}\n\nCONTENT:\n{}\n\nLAST ERROR: {}",
        task.objective,
        state.url_or_unknown(),
        state.headlines_text(),
        content,
        state.last_error_text(),
    )
}
