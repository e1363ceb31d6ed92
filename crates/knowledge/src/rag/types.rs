//! Answer types.

use crate::types::{FailureKind, ScoredPassage};
use serde::{Deserialize, Serialize};

/// Returned when retrieval finds nothing relevant or the model produced no
/// usable text.
pub const NOT_FOUND_ANSWER: &str = "No relevant information was found in the documents.";

/// Returned when a stage of the pipeline failed.
pub const ERROR_ANSWER: &str =
    "An error occurred while processing your question. Please try again.";

/// A passage an answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Passage label, e.g. "report.pdf (chunk 2)"
    pub label: String,

    /// Similarity to the query
    pub score: f32,
}

impl From<&ScoredPassage> for SourceRef {
    fn from(scored: &ScoredPassage) -> Self {
        Self {
            label: scored.passage.label.clone(),
            score: scored.score,
        }
    }
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// A cleaned, non-empty answer and the passages behind it
    Answered { text: String, sources: Vec<SourceRef> },
    /// Nothing relevant was retrieved, or the answer came out empty
    NotFound,
    /// A stage failed; the query can be retried
    Failed { kind: FailureKind },
}

impl AnswerOutcome {
    pub fn failed(kind: FailureKind) -> Self {
        Self::Failed { kind }
    }

    /// The user-facing text: the answer or one of the two sentinels.
    pub fn text(&self) -> &str {
        match self {
            Self::Answered { text, .. } => text,
            Self::NotFound => NOT_FOUND_ANSWER,
            Self::Failed { .. } => ERROR_ANSWER,
        }
    }

    pub fn sources(&self) -> &[SourceRef] {
        match self {
            Self::Answered { sources, .. } => sources,
            _ => &[],
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Pipeline stage, reported as a query moves through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieving,
    /// Retrieval produced nothing to generate from
    NoMatch,
    Generating,
    Cleaning,
}
