//! Shared types for retrieval and answering.

use serde::{Deserialize, Serialize};

/// A bounded slice of one document, built fresh for each retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// `"<document name> (chunk <n>)"`, n starting at 1
    pub label: String,
    pub text: String,
}

impl Passage {
    pub fn new(document: &str, index: usize, text: impl Into<String>) -> Self {
        Self {
            label: format!("{} (chunk {})", document, index + 1),
            text: text.into(),
        }
    }
}

/// A passage with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    #[serde(flatten)]
    pub passage: Passage,
    pub score: f32,
}

/// Why a query could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The embedding backend returned an error
    Encoder,
    /// The encoder returned a different number of vectors than requested
    EmbeddingCount,
    /// Query and passage vectors differ in length
    DimensionMismatch,
    /// The prompt template failed to render
    Prompt,
    /// The text-generation backend failed
    Generation,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Encoder => "encoder",
            Self::EmbeddingCount => "embedding_count",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::Prompt => "prompt",
            Self::Generation => "generation",
        };
        f.write_str(name)
    }
}
