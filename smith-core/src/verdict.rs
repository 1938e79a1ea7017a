//! Oracle verdicts
//!
//! The decision oracle answers in free text. A reply starting with `DONE:`
//! ends the run, one starting with `NOT_DONE:` asks for another action.
//! Anything else is kept verbatim as [`Verdict::Malformed`].

use serde::{Deserialize, Serialize};

const DONE_PREFIX: &str = "DONE";
const NOT_DONE_PREFIX: &str = "NOT_DONE";

/// The oracle's decision for one iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Everything needed has been collected
    Done { summary: String },
    /// More browsing is needed; guidance says what is missing and where to go
    NotDone { guidance: String },
    /// Reply matched neither prefix
    Malformed { raw: String },
}

impl Verdict {
    /// Parse an oracle reply by its prefix
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim();

        if let Some(rest) = strip_keyword(reply, NOT_DONE_PREFIX) {
            return Verdict::NotDone {
                guidance: rest.to_string(),
            };
        }

        if let Some(rest) = strip_keyword(reply, DONE_PREFIX) {
            return Verdict::Done {
                summary: rest.to_string(),
            };
        }

        Verdict::Malformed {
            raw: reply.to_string(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Verdict::Done { .. })
    }

    /// Guidance for the action synthesizer, if this verdict calls for an action.
    ///
    /// Malformed replies are acted on with their raw text as guidance.
    pub fn guidance(&self) -> Option<&str> {
        match self {
            Verdict::Done { .. } => None,
            Verdict::NotDone { guidance } => Some(guidance),
            Verdict::Malformed { raw } => Some(raw),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Verdict::Done { .. } => "done",
            Verdict::NotDone { .. } => "not_done",
            Verdict::Malformed { .. } => "malformed",
        }
    }
}

/// Strip `KEYWORD:` (colon optional) followed by a word boundary
fn strip_keyword<'a>(reply: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = reply.strip_prefix(keyword)?;

    if let Some(after_colon) = rest.strip_prefix(':') {
        return Some(after_colon.trim());
    }

    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return Some(rest.trim());
    }

    None
}
