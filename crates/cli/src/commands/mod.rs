//! Command handlers for the docqa CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod corpus;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use corpus::CorpusCommand;

use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{Corpus, RagPipeline};

/// Load the corpus and build the answering pipeline. Both steps are fatal
/// on failure.
pub(crate) async fn build_pipeline(config: &AppConfig) -> AppResult<RagPipeline> {
    let corpus = Corpus::load(&config.corpus_file())?;
    RagPipeline::from_config(config, corpus).await
}
