//! Run settings
//!
//! Defaults cover a normal run. A TOML file can override any subset:
//!
//! ```toml
//! max_attempts = 10
//! start_url = "https://duckduckgo.com"
//! deny_list = ["https://duckduckgo.com", "https://www.google"]
//!
//! [crawl]
//! max_files = 20
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use smith_browser::{ChromeConfig, CrawlLimits, HttpConfig};
use smith_core::{default_deny_list, default_engine, DEFAULT_MAX_ATTEMPTS};

/// Errors loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Caps on one repository walk
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub max_dirs: usize,
    pub max_files: usize,
    pub max_concurrent: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        let limits = CrawlLimits::default();
        Self {
            max_dirs: limits.max_dirs,
            max_files: limits.max_files,
            max_concurrent: limits.max_concurrent,
        }
    }
}

impl CrawlSettings {
    pub fn limits(&self) -> CrawlLimits {
        CrawlLimits {
            max_dirs: self.max_dirs,
            max_files: self.max_files,
            max_concurrent: self.max_concurrent.max(1),
        }
    }
}

/// Everything one run needs besides the task, the oracle and the browser
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Iteration budget
    pub max_attempts: u32,
    /// Neutral page loaded before the first observation
    pub start_url: String,
    /// URL substrings that never get a deep extraction pass
    pub deny_list: Vec<String>,
    /// Pause after each executed command, in milliseconds
    pub settle_ms: u64,
    /// Run Chrome without a window
    pub headless: bool,
    /// Proxy for repository fetches
    pub proxy: Option<String>,
    /// Timeout for repository fetches, in seconds
    pub http_timeout_secs: u64,
    /// Directory of prompt template overrides
    pub prompts_dir: Option<PathBuf>,
    pub crawl: CrawlSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            start_url: default_engine().home_url.to_string(),
            deny_list: default_deny_list(),
            settle_ms: 1000,
            headless: true,
            proxy: None,
            http_timeout_secs: HttpConfig::default().timeout_secs,
            prompts_dir: None,
            crawl: CrawlSettings::default(),
        }
    }
}

impl RunSettings {
    /// Parse and validate settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_attempts == 0 {
            return Err(SettingsError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if !(self.start_url.starts_with("http://") || self.start_url.starts_with("https://")) {
            return Err(SettingsError::Invalid(format!(
                "start_url must be an http(s) URL, got '{}'",
                self.start_url
            )));
        }
        if self.deny_list.iter().any(|entry| entry.trim().is_empty()) {
            return Err(SettingsError::Invalid(
                "deny_list entries must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_start_url(mut self, url: &str) -> Self {
        self.start_url = url.to_string();
        self
    }

    pub fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_prompts_dir(mut self, dir: PathBuf) -> Self {
        self.prompts_dir = Some(dir);
        self
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            proxy: self.proxy.clone(),
            timeout_secs: self.http_timeout_secs,
        }
    }

    pub fn chrome_config(&self) -> ChromeConfig {
        let config = ChromeConfig::default();
        if self.headless {
            config
        } else {
            config.visible()
        }
    }
}
