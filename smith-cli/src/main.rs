//! Blacksmith Scout CLI
//!
//! Oracle-guided web collection for fine-tuning corpora.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use smith_agents::{
    create_anthropic_backend, create_backend, AnthropicConfig, ContentExtractor, LlmBackend,
    LlmError, OpenAIBackendConfig, PromptRegistry, SharedBackend, DEFAULT_MODEL,
};
use smith_browser::{normalize_extensions, ChromeBrowser, GithubSource};
use smith_core::{AgentResult, SessionState, TaskSpec, PROMPT_CONTENT_CHARS};
use smith_runtime::{ProgressHandle, RunSettings, Scraper};

#[derive(Parser)]
#[command(name = "blacksmith")]
#[command(author, version, about = "Blacksmith Scout: oracle-guided web collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect text for a task by browsing under the oracle's guidance
    Run {
        /// What to collect, in plain language
        #[arg(short, long)]
        task: String,

        #[command(flatten)]
        oracle: OracleArgs,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the attempt budget
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Show the browser window
        #[arg(long)]
        visible: bool,

        /// Directory of prompt template overrides
        #[arg(long)]
        prompts: Option<PathBuf>,

        /// Log a progress summary every N seconds (0 = off)
        #[arg(long, default_value = "0")]
        progress_secs: u64,

        /// Output file for the corpus (default: scraped_content_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the content extractor on a saved page
    Extract {
        /// URL the page was saved from (selects the extraction strategy)
        #[arg(short, long)]
        url: String,

        /// Saved page markup
        #[arg(short, long)]
        file: PathBuf,

        /// Task the content is for (used to pick repository files)
        #[arg(short, long, default_value = "")]
        task: String,

        /// Repository file extensions to read, comma-separated (skips the oracle)
        #[arg(long)]
        extensions: Option<String>,

        #[command(flatten)]
        oracle: OracleArgs,
    },

    /// List the prompt templates in effect
    Prompts {
        /// Directory of prompt template overrides
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct OracleArgs {
    /// Oracle model to use
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,

    /// Use Anthropic instead of OpenAI
    #[arg(long)]
    anthropic: bool,

    /// Use OpenRouter instead of OpenAI
    #[arg(long)]
    openrouter: bool,

    /// OpenAI-compatible server to use instead of api.openai.com
    #[arg(long)]
    base_url: Option<String>,
}

impl OracleArgs {
    fn provider(&self) -> &'static str {
        if self.anthropic {
            "Anthropic"
        } else if self.openrouter {
            "OpenRouter"
        } else if self.base_url.is_some() {
            "local"
        } else {
            "OpenAI"
        }
    }

    fn backend(&self) -> Result<SharedBackend> {
        let model = &self.model;

        let backend = if self.anthropic {
            let key = self.anthropic_key.as_deref().ok_or_else(|| {
                anyhow::anyhow!("Anthropic API key required. Set ANTHROPIC_API_KEY or use --anthropic-key")
            })?;
            create_anthropic_backend(AnthropicConfig::new(key, model))?
        } else if self.openrouter {
            let key = self.openrouter_key.as_deref().ok_or_else(|| {
                anyhow::anyhow!("OpenRouter API key required. Set OPENROUTER_API_KEY or use --openrouter-key")
            })?;
            create_backend(OpenAIBackendConfig::openrouter(key, model))?
        } else if let Some(base_url) = &self.base_url {
            let mut config = OpenAIBackendConfig::local(base_url, model);
            if let Some(key) = &self.api_key {
                config.api_key = key.clone();
            }
            create_backend(config)?
        } else {
            let key = self.api_key.as_deref().ok_or_else(|| {
                anyhow::anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key")
            })?;
            create_backend(OpenAIBackendConfig::openai(key, model))?
        };

        Ok(backend)
    }
}

/// Stands in for the oracle when `extract` runs without credentials
struct OfflineBackend;

#[async_trait]
impl LlmBackend for OfflineBackend {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Config(
            "no oracle configured; pass --extensions or an API key".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

/// What gets written for the fine-tuning step
#[derive(Serialize)]
struct CorpusExport<'a> {
    task: &'a str,
    timestamp: String,
    run_id: String,
    completed: bool,
    attempts_used: u32,
    outcome: smith_core::RunOutcome,
    summary: Option<&'a str>,
    source_url: Option<&'a str>,
    content: Option<&'a str>,
}

impl<'a> CorpusExport<'a> {
    fn new(task: &'a TaskSpec, result: &'a AgentResult) -> Self {
        Self {
            task: &task.objective,
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_id: result.run_id.to_string(),
            completed: result.completed,
            attempts_used: result.attempts_used,
            outcome: result.outcome,
            summary: result.summary.as_deref(),
            source_url: result.final_document.as_ref().map(|doc| doc.url.as_str()),
            content: result.corpus(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            task,
            oracle,
            config,
            max_attempts,
            visible,
            prompts,
            progress_secs,
            output,
        } => {
            let mut settings = match config {
                Some(path) => RunSettings::load(&path)?,
                None => RunSettings::default(),
            };
            if let Some(max_attempts) = max_attempts {
                settings = settings.with_max_attempts(max_attempts);
            }
            if visible {
                settings = settings.with_headless(false);
            }
            if let Some(dir) = prompts {
                settings = settings.with_prompts_dir(dir);
            }

            run_task(&task, &oracle, settings, progress_secs, output).await?;
        }
        Commands::Extract {
            url,
            file,
            task,
            extensions,
            oracle,
        } => {
            extract_page(&url, &file, &task, extensions.as_deref(), &oracle).await?;
        }
        Commands::Prompts { dir } => {
            list_prompts(dir)?;
        }
    }

    Ok(())
}

async fn run_task(
    task: &str,
    oracle: &OracleArgs,
    settings: RunSettings,
    progress_secs: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("⚒️  Blacksmith Scout\n");

    let task = TaskSpec::new(task);
    if task.objective.is_empty() {
        anyhow::bail!("Task must not be empty");
    }

    let backend = oracle.backend()?;
    println!("📡 Provider: {} | Model: {}", oracle.provider(), backend.model_name());
    println!("🔍 Task: {}", task.objective);
    println!(
        "🔁 Attempts: {} | Start page: {}\n",
        settings.max_attempts, settings.start_url
    );

    let source = Arc::new(GithubSource::from_env(&settings.http_config())?);
    let cancel = CancellationToken::new();
    let scraper = Scraper::new(backend, source, settings.clone())?.with_cancellation(cancel.clone());
    let progress = scraper.progress();

    let browser = ChromeBrowser::launch(settings.chrome_config())
        .await
        .context("Could not start Chrome")?;

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current attempt");
                cancel.cancel();
            }
        })
    };

    let reporter = (progress_secs > 0)
        .then(|| tokio::spawn(report_progress(progress, Duration::from_secs(progress_secs))));

    println!("🚀 Browsing...");
    let result = scraper.run(browser, &task).await;

    ctrl_c.abort();
    if let Some(reporter) = reporter {
        reporter.abort();
    }

    let result = result?;

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("scraped_content_{}.json", timestamp))
    });

    let export = CorpusExport::new(&task, &result);
    fs::write(&output_path, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Could not write {}", output_path.display()))?;

    match result.corpus() {
        Some(content) => {
            println!(
                "\n✅ Run {:?} after {} attempts",
                result.outcome, result.attempts_used
            );
            if let Some(summary) = &result.summary {
                println!("📝 {}", summary);
            }
            println!("📄 Corpus saved to: {}", output_path.display());

            println!("\n{}", "=".repeat(60));
            let preview: String = content.chars().take(1000).collect();
            println!("{}", preview);
            if content.chars().count() > 1000 {
                println!("...\n[truncated - see full corpus in output file]");
            }
        }
        None => {
            println!(
                "\n⚠️  Run {:?} after {} attempts without collecting any content.",
                result.outcome, result.attempts_used
            );
            println!("   Try a more specific task or a larger --max-attempts.");
            println!("📄 Run record saved to: {}", output_path.display());
        }
    }

    Ok(())
}

async fn report_progress(progress: ProgressHandle, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let snapshot = progress.snapshot();
        match progress.summarize().await {
            Ok(summary) => info!(
                "[{} {}/{}] {}",
                snapshot.stage, snapshot.attempts_used, snapshot.max_attempts, summary
            ),
            Err(e) => warn!("Progress summary failed: {}", e),
        }
    }
}

async fn extract_page(
    url: &str,
    file: &Path,
    task: &str,
    extensions: Option<&str>,
    oracle: &OracleArgs,
) -> Result<()> {
    let markup = fs::read_to_string(file)
        .with_context(|| format!("Could not read {}", file.display()))?;

    let backend: SharedBackend = match oracle.backend() {
        Ok(backend) => backend,
        Err(_) => Arc::new(OfflineBackend),
    };

    let settings = RunSettings::default();
    let source = Arc::new(GithubSource::from_env(&settings.http_config())?);
    let mut extractor = ContentExtractor::new(backend, source, &PromptRegistry::load_embedded())?
        .with_limits(settings.crawl.limits());
    if let Some(extensions) = extensions {
        extractor = extractor.with_extensions(normalize_extensions(extensions.split(',')));
    }

    let mut state = SessionState::new();
    let headlines = extractor.extract_headlines(&mut state, url, &markup);
    state.headlines = Some(headlines);

    println!("🔗 {}", url);
    println!("📰 Headlines: {}", state.headlines_text());

    match extractor.extract_body(url, &markup, &TaskSpec::new(task)).await {
        Some(doc) => {
            println!("📄 Title: {}", doc.title);
            println!("   {} chars\n", doc.char_count());
            println!("{}", doc.preview(PROMPT_CONTENT_CHARS));
        }
        None => println!("⚠️  No body content extracted"),
    }

    Ok(())
}

fn list_prompts(dir: Option<PathBuf>) -> Result<()> {
    let registry = match dir {
        Some(dir) => PromptRegistry::load_with_overrides(&dir)
            .with_context(|| format!("Could not read {}", dir.display()))?,
        None => PromptRegistry::load_embedded(),
    };

    let mut ids = registry.list_ids();
    ids.sort_unstable();

    for id in ids {
        if let Some(template) = registry.get(id) {
            println!("{:<12} {}", id, template.prompt.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_core::{Document, RunOutcome};

    fn finished_run() -> AgentResult {
        AgentResult::new(
            Default::default(),
            RunOutcome::Done,
            Some(Document::new(
                "https://en.wikipedia.org/wiki/Rust",
                "Rust",
                "Rust is a language.".to_string(),
            )),
            2,
            Some("found it".to_string()),
        )
    }

    #[test]
    fn test_corpus_export_fields() {
        let task = TaskSpec::new("What is Rust?");
        let result = finished_run();
        let json = serde_json::to_value(CorpusExport::new(&task, &result)).unwrap();

        assert_eq!(json["task"], "What is Rust?");
        assert_eq!(json["completed"], true);
        assert_eq!(json["attempts_used"], 2);
        assert_eq!(json["outcome"], "done");
        assert_eq!(json["content"], "Rust is a language.");
        assert_eq!(json["source_url"], "https://en.wikipedia.org/wiki/Rust");
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "blacksmith",
            "run",
            "--task",
            "collect rust docs",
            "--max-attempts",
            "3",
            "--api-key",
            "sk-test",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                task,
                max_attempts,
                oracle,
                ..
            } => {
                assert_eq!(task, "collect rust docs");
                assert_eq!(max_attempts, Some(3));
                assert_eq!(oracle.model, DEFAULT_MODEL);
                assert_eq!(oracle.provider(), "OpenAI");
                assert!(oracle.backend().is_ok());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_extract_command() {
        let cli = Cli::try_parse_from([
            "blacksmith",
            "extract",
            "--url",
            "https://github.com/octo/sample",
            "--file",
            "page.html",
            "--extensions",
            ".py,.md",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Extract { extensions: Some(ref ext), .. } if ext == ".py,.md"
        ));
    }
}
