//! Relevance filter
//!
//! Decides whether a page is worth a deep extraction pass. Search engine
//! result pages are navigation aids, not content.

use tracing::debug;

use smith_core::{default_deny_list, SessionState};

/// URL deny list check
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    deny_list: Vec<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(default_deny_list())
    }
}

impl RelevanceFilter {
    pub fn new(deny_list: Vec<String>) -> Self {
        Self { deny_list }
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// False iff the current URL contains a deny-listed substring.
    /// A state with no URL yet has nothing to deny.
    pub fn is_relevant(&self, state: &SessionState) -> bool {
        let Some(url) = state.current_url.as_deref() else {
            return true;
        };

        match self.deny_list.iter().find(|denied| url.contains(denied.as_str())) {
            Some(denied) => {
                debug!("{} matches deny list entry {}", url, denied);
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(url: &str) -> SessionState {
        SessionState {
            current_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_pages_are_not_relevant() {
        let filter = RelevanceFilter::default();
        assert!(!filter.is_relevant(&at("https://www.google.com/search?q=rust")));
        assert!(!filter.is_relevant(&at("https://www.bing.com/search?q=rust")));
    }

    #[test]
    fn test_content_pages_are_relevant() {
        let filter = RelevanceFilter::default();
        assert!(filter.is_relevant(&at("https://en.wikipedia.org/wiki/Rust")));
        assert!(filter.is_relevant(&at("https://github.com/rust-lang/rust")));
    }

    #[test]
    fn test_substring_anywhere_in_url() {
        let filter = RelevanceFilter::new(vec!["tracker".to_string()]);
        assert!(!filter.is_relevant(&at("https://example.com/?ref=tracker")));
    }

    #[test]
    fn test_missing_url_is_relevant() {
        assert!(RelevanceFilter::default().is_relevant(&SessionState::new()));
    }

    #[test]
    fn test_empty_deny_list() {
        let filter = RelevanceFilter::new(Vec::new());
        assert!(filter.is_relevant(&at("https://www.google.com")));
    }
}
