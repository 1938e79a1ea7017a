//! Prompt templates for oracle calls
//!
//! Every oracle call takes its instructions from a TOML template. The defaults
//! are embedded from `prompts/`; a directory of same-id files can override
//! them per run.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::AgentError;

/// Judge that reads the page and returns a DONE / NOT_DONE verdict
pub const THINKER_PROMPT: &str = "thinker";
/// Writer of the next browser command
pub const WORKER_PROMPT: &str = "worker";
/// Picker of repository file extensions
pub const EXTENSIONS_PROMPT: &str = "extensions";
/// One-sentence progress reporter
pub const PROGRESS_PROMPT: &str = "progress";

/// A prompt template loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub prompt: PromptMetadata,
    pub template: TemplateBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateBody {
    pub system: String,
}

fn default_enabled() -> bool {
    true
}

impl PromptTemplate {
    pub fn system_prompt(&self) -> &str {
        self.template.system.trim()
    }
}

/// Registry of prompt templates keyed by id
#[derive(Debug, Default, Clone)]
pub struct PromptRegistry {
    prompts: HashMap<String, PromptTemplate>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Templates shipped with the crate
    pub fn load_embedded() -> Self {
        let mut registry = Self::new();

        let embedded = [
            include_str!("../prompts/thinker.toml"),
            include_str!("../prompts/worker.toml"),
            include_str!("../prompts/extensions.toml"),
            include_str!("../prompts/progress.toml"),
        ];

        for toml_str in embedded {
            match toml::from_str::<PromptTemplate>(toml_str) {
                Ok(template) => registry.register(template),
                Err(e) => warn!("Skipping embedded prompt: {}", e),
            }
        }

        registry
    }

    /// Embedded templates with any `*.toml` in `dir` layered on top
    pub fn load_with_overrides<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let mut registry = Self::load_embedded();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if !path.extension().is_some_and(|ext| ext == "toml") {
                continue;
            }

            let content = std::fs::read_to_string(&path)?;
            match toml::from_str::<PromptTemplate>(&content) {
                Ok(template) => {
                    debug!("Prompt override '{}' from {}", template.prompt.id, path.display());
                    registry.register(template);
                }
                Err(e) => warn!("Ignoring prompt file {}: {}", path.display(), e),
            }
        }

        Ok(registry)
    }

    /// Register a template, replacing one with the same id.
    /// A disabled template removes the id.
    pub fn register(&mut self, template: PromptTemplate) {
        if template.prompt.enabled {
            self.prompts.insert(template.prompt.id.clone(), template);
        } else {
            self.prompts.remove(&template.prompt.id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.prompts.get(id)
    }

    /// System prompt for `id`, or an error naming the missing template
    pub fn system(&self, id: &str) -> Result<String, AgentError> {
        self.get(id)
            .map(|t| t.system_prompt().to_string())
            .ok_or_else(|| AgentError::MissingPrompt(id.to_string()))
    }

    pub fn list_ids(&self) -> Vec<&str> {
        self.prompts.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
