//! Retrieval and grounded answering over an extracted document corpus.
//!
//! The corpus is loaded once; every query rebuilds the candidate passage
//! pool, ranks it by embedding similarity, and answers from the passages that
//! clear the confidence threshold, or reports that nothing relevant was found.

pub mod chunker;
pub mod cleaner;
pub mod context;
pub mod corpus;
pub mod embeddings;
pub mod rag;
pub mod retrieve;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use cleaner::ResponseCleaner;
pub use context::{ArtifactFilter, ContextAssembler};
pub use corpus::{Corpus, CorpusStats, Document, DocumentStats};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{AnswerOutcome, RagPipeline, SourceRef, Stage, ERROR_ANSWER, NOT_FOUND_ANSWER};
pub use retrieve::{RetrievalResult, RetrievalStatus, Retriever};
pub use session::{Session, SessionState, SessionSummary};
pub use types::{FailureKind, Passage, ScoredPassage};
