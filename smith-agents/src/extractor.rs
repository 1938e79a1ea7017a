//! Content extractor
//!
//! Two passes over an observed page:
//! - headlines, cheap and always run
//! - the body, chosen by page kind (repository walk or article paragraphs)
//!
//! Extraction never fails the run. A page that yields nothing produces `None`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use smith_browser::{
    extract_article, extract_headlines, normalize_extensions, walk_repository, CrawlLimits,
    RepositoryRef, RepositorySource,
};
use smith_core::{Document, SessionState, TaskSpec};

use crate::{AgentError, PromptRegistry, SharedBackend, EXTENSIONS_PROMPT};

/// Headline and body extraction for one run.
///
/// Holds the file extensions picked for repository pages so the oracle is
/// asked at most once per run.
pub struct ContentExtractor {
    backend: SharedBackend,
    source: Arc<dyn RepositorySource>,
    limits: CrawlLimits,
    extensions_prompt: String,
    extensions: Option<Vec<String>>,
}

impl ContentExtractor {
    pub fn new(
        backend: SharedBackend,
        source: Arc<dyn RepositorySource>,
        prompts: &PromptRegistry,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            backend,
            source,
            limits: CrawlLimits::default(),
            extensions_prompt: prompts.system(EXTENSIONS_PROMPT)?,
            extensions: None,
        })
    }

    pub fn with_limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Use these extensions for repository pages instead of asking the oracle
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        if !extensions.is_empty() {
            self.extensions = Some(extensions);
        }
        self
    }

    /// Headline pass. Also records `url` as the state's current URL.
    pub fn extract_headlines(&self, state: &mut SessionState, url: &str, markup: &str) -> Vec<String> {
        state.current_url = Some(url.to_string());

        let headlines = extract_headlines(markup);
        debug!("{} headlines on {}", headlines.len(), url);
        headlines
    }

    /// Deep pass, dispatched on the page kind
    pub async fn extract_body(&mut self, url: &str, markup: &str, task: &TaskSpec) -> Option<Document> {
        let document = match RepositoryRef::parse(url) {
            Some(repo) => self.extract_repository(url, &repo, task).await,
            None => extract_article(url, markup),
        };

        match &document {
            Some(doc) => info!("Extracted {} chars from {}", doc.char_count(), url),
            None => debug!("Nothing extracted from {}", url),
        }

        document
    }

    async fn extract_repository(
        &mut self,
        url: &str,
        repo: &RepositoryRef,
        task: &TaskSpec,
    ) -> Option<Document> {
        let extensions = match self.determine_file_extensions(task).await {
            Ok(extensions) if !extensions.is_empty() => extensions,
            Ok(_) => {
                warn!("No file extensions picked for {}", repo.url);
                return None;
            }
            Err(e) => {
                warn!("Could not pick file extensions for {}: {}", repo.url, e);
                return None;
            }
        };

        let walk = walk_repository(self.source.as_ref(), repo, &extensions, &self.limits).await;
        if walk.truncated {
            info!(
                "Repository walk of {} stopped early after {} files",
                repo.url,
                walk.files.len()
            );
        }

        walk.into_document(url, repo)
    }

    /// File extensions worth reading for this task, asked once per run.
    ///
    /// An empty answer is not cached so a later repository page asks again.
    pub async fn determine_file_extensions(&mut self, task: &TaskSpec) -> Result<Vec<String>, AgentError> {
        if let Some(extensions) = &self.extensions {
            return Ok(extensions.clone());
        }

        let reply = self
            .backend
            .generate(&self.extensions_prompt, &format!("TASK: {}", task.objective))
            .await?;

        let extensions = normalize_extensions(reply.split(|c: char| c == ',' || c == '\n'));
        info!("File extensions for this run: {:?}", extensions);

        if !extensions.is_empty() {
            self.extensions = Some(extensions.clone());
        }
        Ok(extensions)
    }
}
