//! Agent loop
//!
//! Drives one browser under the oracle's guidance:
//! - observe the page (headlines, then the body when the page is relevant)
//! - ask the oracle whether the task is done
//! - otherwise synthesize one command, run it, and record any failure
//!
//! The loop stops on a `DONE` verdict, when the attempt budget runs out, or
//! when the host cancels it. The browser is closed exactly once on every path.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use smith_agents::{
    ActionSynthesizer, AgentError, ContentExtractor, ProgressSummarizer, PromptRegistry,
    RelevanceFilter, SharedBackend, Thinker,
};
use smith_browser::{Browser, BrowserError, RepositorySource};
use smith_core::{ActionCommand, AgentResult, RunOutcome, SessionState, TaskSpec, Verdict};

use crate::{ProgressHandle, RunSettings, RunStage, SettingsError};

/// Errors that end a run without a result
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to load prompt templates: {0}")]
    Prompts(#[source] std::io::Error),

    #[error("Browser setup failed: {0}")]
    Setup(#[source] BrowserError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// One agent run.
///
/// Each scraper owns its own session state, extractor cache and progress
/// handle; it is consumed by [`Scraper::run`].
pub struct Scraper {
    run_id: Uuid,
    settings: RunSettings,
    extractor: ContentExtractor,
    relevance: RelevanceFilter,
    thinker: Thinker,
    synthesizer: ActionSynthesizer,
    progress: ProgressHandle,
    cancel: CancellationToken,
}

impl Scraper {
    pub fn new(
        backend: SharedBackend,
        source: Arc<dyn RepositorySource>,
        settings: RunSettings,
    ) -> Result<Self, RunError> {
        settings.validate()?;

        let prompts = match &settings.prompts_dir {
            Some(dir) => PromptRegistry::load_with_overrides(dir).map_err(RunError::Prompts)?,
            None => PromptRegistry::load_embedded(),
        };

        let extractor = ContentExtractor::new(backend.clone(), source, &prompts)?
            .with_limits(settings.crawl.limits());
        let thinker = Thinker::new(backend.clone(), &prompts)?;
        let synthesizer = ActionSynthesizer::new(backend.clone(), &prompts)?;
        let progress = ProgressHandle::new(
            ProgressSummarizer::new(backend, &prompts)?,
            settings.max_attempts,
        );

        Ok(Self {
            run_id: Uuid::new_v4(),
            relevance: RelevanceFilter::new(settings.deny_list.clone()),
            settings,
            extractor,
            thinker,
            synthesizer,
            progress,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop the run at the next iteration boundary when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Run to a terminal state. The browser is closed before this returns.
    pub async fn run<B: Browser>(mut self, mut browser: B, task: &TaskSpec) -> Result<AgentResult, RunError> {
        info!("Run {} starting: {}", self.run_id, task.objective);
        self.progress.set_stage(RunStage::Scraping);

        let mut state = SessionState::new();
        let mut attempts_used = 0;

        let outcome = self
            .drive(&mut browser, task, &mut state, &mut attempts_used)
            .await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        self.progress.record(attempts_used, &state);
        self.progress.set_stage(RunStage::Finished);

        match outcome {
            Ok((outcome, summary)) => {
                info!(
                    "Run {} finished: {:?} after {} attempts",
                    self.run_id, outcome, attempts_used
                );
                Ok(AgentResult::new(
                    self.run_id,
                    outcome,
                    state.body_content,
                    attempts_used,
                    summary,
                ))
            }
            Err(e) => {
                error!("Run {} failed after {} attempts: {}", self.run_id, attempts_used, e);
                Err(e)
            }
        }
    }

    async fn drive<B: Browser>(
        &mut self,
        browser: &mut B,
        task: &TaskSpec,
        state: &mut SessionState,
        attempts_used: &mut u32,
    ) -> Result<(RunOutcome, Option<String>), RunError> {
        browser
            .navigate(&self.settings.start_url)
            .await
            .map_err(RunError::Setup)?;

        while *attempts_used < self.settings.max_attempts {
            if self.cancel.is_cancelled() {
                info!("Run {} cancelled", self.run_id);
                return Ok((RunOutcome::Cancelled, None));
            }

            *attempts_used += 1;
            info!("Attempt {}/{}", attempts_used, self.settings.max_attempts);

            self.observe(browser, task, state).await;
            self.progress.record(*attempts_used, state);

            let verdict = self.thinker.think(state, task).await?;
            if let Verdict::Done { summary } = verdict {
                return Ok((RunOutcome::Done, Some(summary)));
            }
            if let Verdict::Malformed { raw } = &verdict {
                warn!("Oracle reply had no verdict prefix, acting on it anyway: {}", raw);
            }

            let command = self.synthesizer.synthesize_action(&verdict, state).await?;
            self.act(browser, &command, state).await;
            self.progress.record(*attempts_used, state);
        }

        info!("Attempt budget of {} exhausted", self.settings.max_attempts);
        Ok((RunOutcome::BudgetExhausted, None))
    }

    async fn observe<B: Browser>(&mut self, browser: &mut B, task: &TaskSpec, state: &mut SessionState) {
        let url = match browser.current_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not read current URL: {}", e);
                state.record_error(format!("reading the page failed: {}", e));
                return;
            }
        };

        let markup = match browser.page_source().await {
            Ok(markup) => markup,
            Err(e) => {
                warn!("Could not read page source of {}: {}", url, e);
                state.record_error(format!("reading {} failed: {}", url, e));
                String::new()
            }
        };

        let headlines = self.extractor.extract_headlines(state, &url, &markup);
        state.headlines = Some(headlines);

        if self.relevance.is_relevant(state) {
            state.body_content = self.extractor.extract_body(&url, &markup, task).await;
        } else {
            debug!("Skipping deep extraction on {}", url);
        }

        state.page_markup = Some(markup);
    }

    async fn act<B: Browser>(&self, browser: &mut B, command: &ActionCommand, state: &mut SessionState) {
        let parsed = match command.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unusable command '{}': {}", command, e);
                state.record_error(format!("could not run '{}': {}", command, e));
                return;
            }
        };

        match browser.execute(&parsed).await {
            Ok(()) => debug!("Executed {}", parsed),
            Err(e) => {
                warn!("Command failed: {}", e);
                state.record_error(format!("{} failed: {}", parsed, e));
            }
        }

        if self.settings.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use smith_agents::{LlmBackend, LlmError};
    use smith_browser::{HttpError, RepoEntry, RepositoryRef};
    use smith_core::BrowserCommand;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const START_PAGE: &str = "<html><body><h1>Google</h1><form><input name=q></form></body></html>";

    const ARTICLE_URL: &str = "https://en.wikipedia.org/wiki/Rust_(programming_language)";
    const ARTICLE_PAGE: &str = r#"
        <html><body>
            <h1 id="firstHeading">Rust (programming language)</h1>
            <div id="mw-content-text">
                <table class="infobox"><tr><td><p>Paradigms: multi-paradigm</p></td></tr></table>
                <p>Rust is a general-purpose programming language.</p>
                <h2>History</h2>
                <p>It began as a personal project.</p>
            </div>
        </body></html>
    "#;

    /// Routes each oracle call by the prompt template it came from
    #[derive(Default)]
    struct ScriptedBackend {
        verdicts: Mutex<VecDeque<&'static str>>,
        commands: Mutex<VecDeque<&'static str>>,
        fail_thinker: bool,
        thinker_inputs: Mutex<Vec<String>>,
        worker_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(verdicts: &[&'static str], commands: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                verdicts: Mutex::new(verdicts.iter().copied().collect()),
                commands: Mutex::new(commands.iter().copied().collect()),
                ..Default::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_thinker: true,
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
            if system.contains("NOT_DONE:") {
                if self.fail_thinker {
                    return Err(LlmError::Api("oracle unavailable".to_string()));
                }
                self.thinker_inputs.lock().push(user.to_string());
                let reply = self.verdicts.lock().pop_front().unwrap_or("NOT_DONE: keep looking");
                return Ok(reply.to_string());
            }

            if system.contains("Allowed commands") {
                self.worker_calls.fetch_add(1, Ordering::SeqCst);
                let reply = self.commands.lock().pop_front().unwrap_or(r#"{"action": "back"}"#);
                return Ok(reply.to_string());
            }

            if system.contains("file extensions") {
                return Ok(".py".to_string());
            }

            Ok("The agent is reading a page.".to_string())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Serves canned pages and counts closes
    struct MockBrowser {
        pages: HashMap<String, String>,
        current: String,
        history: Vec<String>,
        executed: Arc<Mutex<Vec<BrowserCommand>>>,
        closes: Arc<AtomicUsize>,
        fail_start: bool,
    }

    impl MockBrowser {
        fn new() -> Self {
            let pages = [
                ("https://www.google.com", START_PAGE),
                (ARTICLE_URL, ARTICLE_PAGE),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

            Self {
                pages,
                current: "about:blank".to_string(),
                history: Vec::new(),
                executed: Arc::new(Mutex::new(Vec::new())),
                closes: Arc::new(AtomicUsize::new(0)),
                fail_start: false,
            }
        }

        fn go(&mut self, url: &str) -> Result<(), BrowserError> {
            if !self.pages.contains_key(url) {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                });
            }
            self.history.push(std::mem::replace(&mut self.current, url.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl Browser for MockBrowser {
        async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
            if self.fail_start {
                return Err(BrowserError::Launch("chrome exited".to_string()));
            }
            self.go(url)
        }

        async fn current_url(&mut self) -> Result<String, BrowserError> {
            Ok(self.current.clone())
        }

        async fn page_source(&mut self) -> Result<String, BrowserError> {
            Ok(self.pages.get(&self.current).cloned().unwrap_or_default())
        }

        async fn execute(&mut self, command: &BrowserCommand) -> Result<(), BrowserError> {
            self.executed.lock().push(command.clone());
            match command {
                BrowserCommand::Navigate { url } => self.go(url),
                BrowserCommand::Back => {
                    if let Some(previous) = self.history.pop() {
                        self.current = previous;
                    }
                    Ok(())
                }
                BrowserCommand::Click { selector } => Err(BrowserError::Command {
                    command: format!("click {}", selector),
                    reason: "no element matches".to_string(),
                }),
                _ => Ok(()),
            }
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct EmptySource;

    #[async_trait]
    impl RepositorySource for EmptySource {
        async fn list_dir(&self, _repo: &RepositoryRef, _path: &str) -> Result<Vec<RepoEntry>, HttpError> {
            Ok(Vec::new())
        }

        async fn fetch_raw(&self, _repo: &RepositoryRef, path: &str) -> Result<String, HttpError> {
            Err(HttpError::Status {
                url: path.to_string(),
                status: 404,
            })
        }
    }

    fn scraper(backend: Arc<ScriptedBackend>, max_attempts: u32) -> Scraper {
        let settings = RunSettings::default()
            .with_max_attempts(max_attempts)
            .with_settle_ms(0);
        Scraper::new(backend, Arc::new(EmptySource), settings).unwrap()
    }

    fn task() -> TaskSpec {
        TaskSpec::new("Collect an overview of the Rust programming language")
    }

    #[tokio::test]
    async fn test_navigate_then_done() {
        let backend = ScriptedBackend::new(
            &["NOT_DONE: open the Wikipedia article on Rust", "DONE: found it"],
            &[r#"```json
{"action": "navigate", "url": "https://en.wikipedia.org/wiki/Rust_(programming_language)"}
```"#],
        );
        let browser = MockBrowser::new();
        let closes = browser.closes.clone();

        let result = scraper(backend, 7).run(browser, &task()).await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Done);
        assert!(result.completed);
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.summary.as_deref(), Some("found it"));

        let doc = result.final_document.unwrap();
        assert_eq!(doc.title, "Rust (programming language)");
        assert_eq!(
            doc.main_text,
            "Rust is a general-purpose programming language.\n\nIt began as a personal project."
        );
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_pages_get_no_deep_pass() {
        let backend = ScriptedBackend::new(&["DONE: nothing to do"], &[]);
        let result = scraper(backend.clone(), 7)
            .run(MockBrowser::new(), &task())
            .await
            .unwrap();

        assert_eq!(result.attempts_used, 1);
        assert!(result.final_document.is_none());
        assert!(result.corpus().is_none());

        let inputs = backend.thinker_inputs.lock();
        assert!(inputs[0].contains("CURRENT URL: https://www.google.com"));
        assert!(inputs[0].contains("[\"Google\"]"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let backend = ScriptedBackend::new(&[], &[]);
        let browser = MockBrowser::new();
        let closes = browser.closes.clone();

        let result = scraper(backend.clone(), 3).run(browser, &task()).await.unwrap();

        assert_eq!(result.outcome, RunOutcome::BudgetExhausted);
        assert!(result.completed);
        assert_eq!(result.attempts_used, 3);
        assert_eq!(backend.thinker_inputs.lock().len(), 3);
        assert_eq!(backend.worker_calls.load(Ordering::SeqCst), 3);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_closes_browser() {
        let browser = MockBrowser::new();
        let closes = browser.closes.clone();

        let scraper = scraper(ScriptedBackend::failing(), 7);
        let progress = scraper.progress();
        let result = scraper.run(browser, &task()).await;

        assert!(matches!(result, Err(RunError::Agent(AgentError::Llm(_)))));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(progress.stage(), RunStage::Finished);
        assert_eq!(progress.attempts_used(), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_closes_browser() {
        let mut browser = MockBrowser::new();
        browser.fail_start = true;
        let closes = browser.closes.clone();

        let result = scraper(ScriptedBackend::new(&[], &[]), 7)
            .run(browser, &task())
            .await;

        assert!(matches!(result, Err(RunError::Setup(_))));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unparseable_command_feeds_next_verdict() {
        let backend = ScriptedBackend::new(&[], &["goto https://en.wikipedia.org"]);
        let browser = MockBrowser::new();
        let executed = browser.executed.clone();

        let result = scraper(backend.clone(), 2).run(browser, &task()).await.unwrap();

        assert_eq!(result.attempts_used, 2);
        // The bad command never reaches the browser; the fallback `back` does
        assert_eq!(*executed.lock(), vec![BrowserCommand::Back]);

        let inputs = backend.thinker_inputs.lock();
        assert!(inputs[0].contains("LAST ERROR: none"));
        assert!(inputs[1].contains("LAST ERROR: could not run 'goto https://en.wikipedia.org'"));
    }

    #[tokio::test]
    async fn test_failed_command_recorded() {
        let backend = ScriptedBackend::new(
            &["NOT_DONE: press the button", "DONE: gave up on the button"],
            &[r##"{"action": "click", "selector": "#missing"}"##],
        );

        let scraper = scraper(backend.clone(), 7);
        let progress = scraper.progress();
        let result = scraper.run(MockBrowser::new(), &task()).await.unwrap();

        assert_eq!(result.attempts_used, 2);
        let last_error = progress.snapshot().state.last_error.unwrap();
        assert!(last_error.contains("click #missing"));
        assert!(last_error.contains("no element matches"));
        assert!(backend.thinker_inputs.lock()[1].contains("no element matches"));
    }

    #[tokio::test]
    async fn test_malformed_verdict_is_acted_on() {
        let backend = ScriptedBackend::new(&["hmm, not sure yet", "DONE: ok"], &[]);
        let result = scraper(backend.clone(), 7)
            .run(MockBrowser::new(), &task())
            .await
            .unwrap();

        assert_eq!(result.outcome, RunOutcome::Done);
        assert_eq!(result.attempts_used, 2);
        assert_eq!(backend.worker_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let browser = MockBrowser::new();
        let closes = browser.closes.clone();

        let scraper = scraper(ScriptedBackend::new(&[], &[]), 7).with_cancellation(token);
        let progress = scraper.progress();
        let result = scraper.run(browser, &task()).await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Cancelled);
        assert!(!result.completed);
        assert_eq!(result.attempts_used, 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(progress.stage(), RunStage::Finished);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = RunSettings::default().with_max_attempts(0);
        let result = Scraper::new(ScriptedBackend::new(&[], &[]), Arc::new(EmptySource), settings);
        assert!(matches!(result, Err(RunError::Settings(_))));
    }
}
