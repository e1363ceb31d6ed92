//! Answering orchestration.
//!
//! Retrieves relevant passages, renders the grounded prompt, generates and
//! cleans the answer. Per-query failures come back as [`AnswerOutcome`]
//! values; only construction can fail with an error.

use crate::cleaner::ResponseCleaner;
use crate::context::{ArtifactFilter, ContextAssembler};
use crate::corpus::Corpus;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::rag::types::{AnswerOutcome, SourceRef, Stage, NOT_FOUND_ANSWER};
use crate::retrieve::{RetrievalStatus, Retriever};
use crate::types::FailureKind;
use docqa_core::{AppConfig, AppResult};
use docqa_llm::{GenerationConfig, Generator, LlmClient};
use docqa_prompt::{load_prompt, PromptBuilder};
use std::sync::Arc;

/// Everything needed to answer questions over one corpus.
///
/// Built once at startup and shared read-only across queries.
pub struct RagPipeline {
    corpus: Corpus,
    retriever: Retriever,
    assembler: ContextAssembler,
    prompt: PromptBuilder,
    generator: Generator,
    generation: GenerationConfig,
    cleaner: ResponseCleaner,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("documents", &self.corpus.len())
            .field("prompt", &self.prompt.id())
            .field("provider", &self.generator.provider_name())
            .field("model", &self.generation.model)
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Assemble a pipeline from already constructed backends.
    pub fn new(
        corpus: Corpus,
        encoder: Arc<dyn EmbeddingProvider>,
        client: Arc<dyn LlmClient>,
        prompt: PromptBuilder,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let artifacts = ArtifactFilter::new()?;
        let generation = GenerationConfig::from_settings(&config.llm.model, &config.generation);
        generation.sampling.validate()?;

        Ok(Self {
            corpus,
            retriever: Retriever::new(encoder, config.retrieval.clone()),
            assembler: ContextAssembler::new(artifacts.clone()),
            prompt,
            generator: Generator::new(client),
            generation,
            cleaner: ResponseCleaner::new(&config.cleaner, artifacts)?,
        })
    }

    /// Build the backends named in `config` and assemble a pipeline.
    ///
    /// # Errors
    /// Unknown providers, an unreachable embedding backend and a missing or
    /// malformed prompt definition are all reported here, before any query.
    pub async fn from_config(config: &AppConfig, corpus: Corpus) -> AppResult<Self> {
        let encoder = create_provider(&config.embedding).await?;
        let client = docqa_llm::create_client(&config.llm)?;

        let prompt = match &config.prompt.id {
            Some(id) => {
                let definition = load_prompt(&config.workspace, id)?;
                PromptBuilder::from_definition(&definition, NOT_FOUND_ANSWER)?
            }
            None => PromptBuilder::builtin(NOT_FOUND_ANSWER)?,
        };

        tracing::info!(
            documents = corpus.len(),
            embedding = %config.embedding.provider,
            llm = %config.llm.provider,
            model = %config.llm.model,
            prompt = prompt.id(),
            "Pipeline ready"
        );

        Self::new(corpus, encoder, client, prompt, config)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Answer one question.
    pub async fn ask(&self, query: &str) -> AnswerOutcome {
        self.ask_observed(query, &mut |_| {}).await
    }

    /// Answer one question, reporting each stage to `observe` as it starts.
    pub async fn ask_observed(&self, query: &str, observe: &mut dyn FnMut(Stage)) -> AnswerOutcome {
        observe(Stage::Retrieving);
        tracing::info!(query_chars = query.chars().count(), "Retrieving passages");

        let result = self.retriever.retrieve(query, self.corpus.documents()).await;
        match result.status {
            RetrievalStatus::Matched if !result.is_empty() => {}
            RetrievalStatus::Failed(kind) => return AnswerOutcome::failed(kind),
            _ => {
                observe(Stage::NoMatch);
                tracing::info!(status = ?result.status, "No relevant passages");
                return AnswerOutcome::NotFound;
            }
        }

        let context = self.assembler.assemble(&result.passages);
        let prompt = match self.prompt.build(query, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to render prompt");
                return AnswerOutcome::failed(FailureKind::Prompt);
            }
        };
        tracing::debug!(
            passages = result.passages.len(),
            context_chars = prompt.metadata.context_chars,
            prompt_chars = prompt.metadata.prompt_chars,
            "Prompt built"
        );

        observe(Stage::Generating);
        tracing::info!(model = %self.generation.model, "Generating answer");
        let generation = match self.generator.generate(&prompt.text, &self.generation).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(error = %e, "Generation failed");
                return AnswerOutcome::failed(FailureKind::Generation);
            }
        };

        observe(Stage::Cleaning);
        let text = self.cleaner.clean(&generation.text);
        tracing::debug!(
            raw_chars = generation.text.chars().count(),
            clean_chars = text.chars().count(),
            finish_reason = ?generation.finish_reason,
            "Cleaned answer"
        );

        if text.is_empty() || text == NOT_FOUND_ANSWER {
            return AnswerOutcome::NotFound;
        }

        AnswerOutcome::Answered {
            text,
            sources: result.passages.iter().map(SourceRef::from).collect(),
        }
    }
}
