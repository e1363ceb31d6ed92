//! Grounded question answering over the loaded corpus.

pub mod ask;
pub mod types;

pub use ask::RagPipeline;
pub use types::{AnswerOutcome, SourceRef, Stage, ERROR_ANSWER, NOT_FOUND_ANSWER};
