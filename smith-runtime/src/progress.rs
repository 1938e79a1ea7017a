//! Run progress for polling hosts
//!
//! A [`ProgressHandle`] is cloned out of a scraper before the run starts and
//! can be read from any task while the loop is running.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use smith_agents::{AgentError, ProgressSummarizer};
use smith_core::SessionState;

/// Where a run is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    #[default]
    NotStarted,
    Scraping,
    Finished,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::NotStarted => write!(f, "not_started"),
            RunStage::Scraping => write!(f, "scraping"),
            RunStage::Finished => write!(f, "finished"),
        }
    }
}

/// Point-in-time copy of a run's progress
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub stage: RunStage,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub state: SessionState,
}

/// Shared view of one run
#[derive(Clone)]
pub struct ProgressHandle {
    inner: Arc<RwLock<ProgressSnapshot>>,
    summarizer: Arc<ProgressSummarizer>,
}

impl ProgressHandle {
    pub(crate) fn new(summarizer: ProgressSummarizer, max_attempts: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ProgressSnapshot {
                max_attempts,
                ..Default::default()
            })),
            summarizer: Arc::new(summarizer),
        }
    }

    pub fn stage(&self) -> RunStage {
        self.inner.read().stage
    }

    pub fn attempts_used(&self) -> u32 {
        self.inner.read().attempts_used
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.read().clone()
    }

    /// One-sentence description of what the run is reading.
    ///
    /// Costs one oracle call once body content exists.
    pub async fn summarize(&self) -> Result<String, AgentError> {
        let state = self.inner.read().state.clone();
        self.summarizer.summarize(&state).await
    }

    pub(crate) fn set_stage(&self, stage: RunStage) {
        self.inner.write().stage = stage;
    }

    pub(crate) fn record(&self, attempts_used: u32, state: &SessionState) {
        let mut snapshot = self.inner.write();
        snapshot.attempts_used = attempts_used;
        snapshot.state = state.clone();
    }
}
