//! Terminal record of an agent run

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Document;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The oracle judged the collected content sufficient
    Done,
    /// The attempt budget ran out
    BudgetExhausted,
    /// The host cancelled the run between iterations
    Cancelled,
}

/// Built once when the loop exits, never mutated afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Run identifier
    pub run_id: Uuid,
    /// True when the run finished trying (done or budget exhausted)
    pub completed: bool,
    /// Most recent deep extraction, if any
    pub final_document: Option<Document>,
    /// Iterations consumed
    pub attempts_used: u32,
    /// How the run ended
    pub outcome: RunOutcome,
    /// The oracle's closing summary when the outcome is `Done`
    pub summary: Option<String>,
}

impl AgentResult {
    pub fn new(
        run_id: Uuid,
        outcome: RunOutcome,
        final_document: Option<Document>,
        attempts_used: u32,
        summary: Option<String>,
    ) -> Self {
        Self {
            run_id,
            completed: !matches!(outcome, RunOutcome::Cancelled),
            final_document,
            attempts_used,
            outcome,
            summary,
        }
    }

    /// Text handed to the downstream corpus consumer
    pub fn corpus(&self) -> Option<&str> {
        self.final_document
            .as_ref()
            .map(|doc| doc.main_text.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}
