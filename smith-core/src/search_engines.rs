//! Web search engine registry
//!
//! Search engines play two roles for the agent: the first active engine's home
//! page is the neutral start page of every run, and all of their result hosts
//! form the deny list the relevance filter checks before deep extraction.

use serde::Serialize;

/// A web search engine
#[derive(Debug, Clone, Serialize)]
pub struct SearchEngine {
    /// Human-readable name
    pub name: &'static str,
    /// Landing page
    pub home_url: &'static str,
    /// URL prefix shared by the landing and result pages
    pub host_prefix: &'static str,
    /// URL template with {query} placeholder
    pub url_template: &'static str,
    /// Whether this engine is currently used
    pub active: bool,
}

impl SearchEngine {
    /// Build search URL for a query
    pub fn build_url(&self, query: &str) -> String {
        self.url_template
            .replace("{query}", &urlencoding::encode(query.trim()))
    }

    /// True when the URL is one of this engine's own pages
    pub fn owns(&self, url: &str) -> bool {
        url.contains(self.host_prefix)
    }
}

/// Default list of search engines
pub static DEFAULT_SEARCH_ENGINES: &[SearchEngine] = &[
    SearchEngine {
        name: "Google",
        home_url: "https://www.google.com",
        host_prefix: "https://www.google",
        url_template: "https://www.google.com/search?q={query}",
        active: true,
    },
    SearchEngine {
        name: "Bing",
        home_url: "https://www.bing.com",
        host_prefix: "https://www.bing",
        url_template: "https://www.bing.com/search?q={query}",
        active: true,
    },
    SearchEngine {
        name: "DuckDuckGo",
        home_url: "https://duckduckgo.com",
        host_prefix: "https://duckduckgo.com",
        url_template: "https://duckduckgo.com/?q={query}",
        active: false,
    },
];

/// Get all active search engines
pub fn active_engines() -> impl Iterator<Item = &'static SearchEngine> {
    DEFAULT_SEARCH_ENGINES.iter().filter(|e| e.active)
}

/// The engine runs start on and `search` commands go to
pub fn default_engine() -> &'static SearchEngine {
    active_engines()
        .next()
        .unwrap_or(&DEFAULT_SEARCH_ENGINES[0])
}

/// URL fragments of pages that never hold task content
pub fn default_deny_list() -> Vec<String> {
    active_engines().map(|e| e.host_prefix.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let engine = default_engine();
        let url = engine.build_url("python programming language");
        assert_eq!(
            url,
            "https://www.google.com/search?q=python%20programming%20language"
        );
    }

    #[test]
    fn test_default_deny_list() {
        let deny = default_deny_list();
        assert!(deny.contains(&"https://www.google".to_string()));
        assert!(deny.contains(&"https://www.bing".to_string()));
        assert!(!deny.iter().any(|d| d.contains("duckduckgo")));
    }

    #[test]
    fn test_owns() {
        let engine = default_engine();
        assert!(engine.owns("https://www.google.com/search?q=x"));
        assert!(engine.owns("https://www.google.co.uk/"));
        assert!(!engine.owns("https://en.wikipedia.org/wiki/Google"));
    }
}
