//! Action synthesizer
//!
//! Turns the oracle's guidance into one browser command from the closed
//! vocabulary in [`smith_core::BrowserCommand`].

use tracing::{debug, info};

use smith_core::{ActionCommand, SessionState, Verdict, DEPRECATED_SPELLINGS};

use crate::{AgentError, PromptRegistry, SharedBackend, WORKER_PROMPT};

/// Writes the next browser command
pub struct ActionSynthesizer {
    backend: SharedBackend,
    system_prompt: String,
}

impl ActionSynthesizer {
    pub fn new(backend: SharedBackend, prompts: &PromptRegistry) -> Result<Self, AgentError> {
        let mut system_prompt = prompts.system(WORKER_PROMPT)?;
        system_prompt.push_str("\n\nNever use these retired spellings:\n");
        for (old, new) in DEPRECATED_SPELLINGS {
            system_prompt.push_str(&format!("- \"{}\" (use \"{}\")\n", old, new));
        }

        Ok(Self {
            backend,
            system_prompt,
        })
    }

    /// Ask the oracle for one command.
    ///
    /// The returned command is sanitized but not yet validated; parsing
    /// happens where it is executed so a bad command lands in `last_error`.
    pub async fn synthesize_action(
        &self,
        verdict: &Verdict,
        state: &SessionState,
    ) -> Result<ActionCommand, AgentError> {
        let guidance = verdict.guidance().ok_or(AgentError::NoAction(verdict.kind()))?;

        let context = format!(
            "GUIDANCE: {}\n\nCURRENT URL: {}\n\nPAGE HEADLINES: {}\n\nLAST ERROR: {}",
            guidance,
            state.url_or_unknown(),
            state.headlines_text(),
            state.last_error_text(),
        );

        let reply = self.backend.generate(&self.system_prompt, &context).await?;
        debug!("Worker reply: {}", reply);

        let command = ActionCommand::sanitize(&reply);
        info!("Next command: {}", command);
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmBackend, LlmError};
    use async_trait::async_trait;
    use smith_core::BrowserCommand;
    use std::sync::{Arc, Mutex};

    struct MockBackend {
        reply: String,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl MockBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn synthesizer(backend: SharedBackend) -> ActionSynthesizer {
        ActionSynthesizer::new(backend, &PromptRegistry::load_embedded()).unwrap()
    }

    fn not_done(guidance: &str) -> Verdict {
        Verdict::NotDone {
            guidance: guidance.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fenced_reply_is_sanitized() {
        let backend = MockBackend::new(
            "```json\n{\"action\": \"navigate\", \"url\": \"https://en.wikipedia.org/wiki/Rust\"}\n```",
        );
        let command = synthesizer(backend)
            .synthesize_action(&not_done("open the Rust article"), &SessionState::new())
            .await
            .unwrap();

        assert_eq!(
            command.parse().unwrap(),
            BrowserCommand::Navigate {
                url: "https://en.wikipedia.org/wiki/Rust".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_done_verdict_needs_no_action() {
        let backend = MockBackend::new("{}");
        let result = synthesizer(backend.clone())
            .synthesize_action(
                &Verdict::Done {
                    summary: "all set".to_string(),
                },
                &SessionState::new(),
            )
            .await;

        assert!(matches!(result, Err(AgentError::NoAction("done"))));
        assert!(backend.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_verdict_used_as_guidance() {
        let backend = MockBackend::new(r#"{"action": "back"}"#);
        let verdict = Verdict::Malformed {
            raw: "go back a page".to_string(),
        };
        synthesizer(backend.clone())
            .synthesize_action(&verdict, &SessionState::new())
            .await
            .unwrap();

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("GUIDANCE: go back a page"));
    }

    #[tokio::test]
    async fn test_prompt_lists_retired_spellings_and_last_error() {
        let backend = MockBackend::new(r#"{"action": "back"}"#);
        let mut state = SessionState::new();
        state.record_error("navigation to https://bad.example failed");

        synthesizer(backend.clone())
            .synthesize_action(&not_done("try again"), &state)
            .await
            .unwrap();

        let prompts = backend.prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.contains("\"goto\" (use \"navigate\")"));
        assert!(user.contains("LAST ERROR: navigation to https://bad.example failed"));
    }
}
