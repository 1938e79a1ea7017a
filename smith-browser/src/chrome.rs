//! Chrome-backed browser session
//!
//! `headless_chrome` is synchronous, so every tab operation runs on the
//! blocking pool with a clone of the tab handle.

use async_trait::async_trait;
use headless_chrome::{Browser as ChromeProcess, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use smith_core::{default_engine, BrowserCommand};

use crate::{Browser, BrowserError};

/// Chrome launch configuration
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Window size in pixels
    pub window_size: (u32, u32),
    /// Timeout for element lookups and navigation
    pub timeout_secs: u64,
    /// Pause after navigation and clicks so scripts can render
    pub settle_ms: u64,
    /// Close the browser when idle this long
    pub idle_timeout_secs: u64,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1280, 900),
            timeout_secs: 20,
            settle_ms: 1000,
            idle_timeout_secs: 300,
        }
    }
}

impl ChromeConfig {
    pub fn visible(mut self) -> Self {
        self.headless = false;
        self
    }

    fn launch_options(&self) -> LaunchOptions<'static> {
        LaunchOptions {
            headless: self.headless,
            window_size: Some(self.window_size),
            idle_browser_timeout: Duration::from_secs(self.idle_timeout_secs),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-infobars"),
            ],
            ..Default::default()
        }
    }
}

/// A browser session on a single Chrome tab
pub struct ChromeBrowser {
    process: Option<ChromeProcess>,
    tab: Option<Arc<Tab>>,
    config: ChromeConfig,
}

impl ChromeBrowser {
    /// Launch Chrome and open a tab
    pub async fn launch(config: ChromeConfig) -> Result<Self, BrowserError> {
        let options = config.launch_options();
        let timeout = Duration::from_secs(config.timeout_secs);

        info!("Launching Chrome (headless: {})", config.headless);

        let (process, tab) = tokio::task::spawn_blocking(move || {
            let process =
                ChromeProcess::new(options).map_err(|e| BrowserError::Launch(format!("{:#}", e)))?;
            let tab = process
                .new_tab()
                .map_err(|e| BrowserError::Launch(format!("{:#}", e)))?;
            tab.set_default_timeout(timeout);
            Ok::<_, BrowserError>((process, tab))
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))??;

        debug!("Chrome ready");

        Ok(Self {
            process: Some(process),
            tab: Some(tab),
            config,
        })
    }

    /// Run a blocking operation against the tab
    async fn with_tab<T, F>(&self, op: F) -> Result<T, BrowserError>
    where
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
        T: Send + 'static,
    {
        let tab = self.tab.clone().ok_or(BrowserError::Closed)?;

        tokio::task::spawn_blocking(move || op(&*tab))
            .await
            .map_err(|e| BrowserError::Task(e.to_string()))?
    }
}

fn navigate_tab(tab: &Tab, url: &str, settle: Duration) -> Result<(), BrowserError> {
    let failed = |e: anyhow::Error| BrowserError::Navigation {
        url: url.to_string(),
        reason: format!("{:#}", e),
    };

    tab.navigate_to(url).map_err(failed)?;
    tab.wait_until_navigated().map_err(failed)?;
    std::thread::sleep(settle);
    Ok(())
}

fn run_command(tab: &Tab, command: &BrowserCommand, settle: Duration) -> Result<(), BrowserError> {
    let failed = |e: anyhow::Error| BrowserError::Command {
        command: command.to_string(),
        reason: format!("{:#}", e),
    };

    match command {
        BrowserCommand::Navigate { url } => navigate_tab(tab, url, settle)?,
        BrowserCommand::Search { query } => {
            navigate_tab(tab, &default_engine().build_url(query), settle)?
        }
        BrowserCommand::Click { selector } => {
            tab.find_element(selector).map_err(failed)?.click().map_err(failed)?;
            std::thread::sleep(settle);
        }
        BrowserCommand::Type { selector, text } => {
            tab.find_element(selector).map_err(failed)?.click().map_err(failed)?;
            tab.type_str(text).map_err(failed)?;
        }
        BrowserCommand::PressKey { key } => {
            tab.press_key(key).map_err(failed)?;
            std::thread::sleep(settle);
        }
        BrowserCommand::Wait {
            selector: Some(selector),
            timeout_ms,
        } => {
            tab.wait_for_element_with_custom_timeout(selector, Duration::from_millis(*timeout_ms))
                .map_err(failed)?;
        }
        BrowserCommand::Wait {
            selector: None,
            timeout_ms,
        } => std::thread::sleep(Duration::from_millis(*timeout_ms)),
        BrowserCommand::Back => {
            tab.evaluate("window.history.back()", false).map_err(failed)?;
            std::thread::sleep(settle);
        }
    }

    Ok(())
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        let url = url.to_string();
        let settle = Duration::from_millis(self.config.settle_ms);
        self.with_tab(move |tab| navigate_tab(tab, &url, settle)).await
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        self.with_tab(|tab| Ok(tab.get_url())).await
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.with_tab(|tab| {
            tab.get_content()
                .map_err(|e| BrowserError::Read(format!("{:#}", e)))
        })
        .await
    }

    async fn execute(&mut self, command: &BrowserCommand) -> Result<(), BrowserError> {
        debug!("Executing: {}", command);
        let command = command.clone();
        let settle = Duration::from_millis(self.config.settle_ms);
        self.with_tab(move |tab| run_command(tab, &command, settle)).await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(tab) = self.tab.take() else {
            return Err(BrowserError::Closed);
        };

        let closed = tokio::task::spawn_blocking(move || tab.close(true))
            .await
            .map_err(|e| BrowserError::Task(e.to_string()))?;

        if let Err(e) = closed {
            warn!("Tab did not close cleanly: {:#}", e);
        }

        // Dropping the process handle shuts Chrome down
        self.process.take();
        info!("Chrome session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChromeConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout_secs, 20);
    }

    #[test]
    fn test_launch_options() {
        let config = ChromeConfig::default().visible();
        let options = config.launch_options();
        assert!(!options.headless);
        assert_eq!(options.window_size, Some((1280, 900)));
        assert!(options
            .args
            .iter()
            .any(|arg| *arg == OsStr::new("--no-first-run")));
    }
}
