//! HTTP client for sub-page fetches
//!
//! Deep extraction of repository pages fetches directory listings and raw
//! files directly over HTTP instead of through the browser.

use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Optional proxy URL (http://, https:// or socks5h://)
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: 30,
        }
    }
}

/// Errors from HTTP fetches
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create an HTTP client from configuration
pub fn create_http_client(config: &HttpConfig) -> Result<Client, HttpError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(random_user_agent());

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| HttpError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| HttpError::ClientBuild(e.to_string()))
}
