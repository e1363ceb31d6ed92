//! Passage retrieval: candidate pool, similarity ranking and confidence gate.
//!
//! Every call rebuilds the pool from the documents and encodes it afresh.
//! Failures never escape as errors; they are reported in the result status.

use crate::chunker;
use crate::corpus::Document;
use crate::embeddings::EmbeddingProvider;
use crate::types::{FailureKind, Passage, ScoredPassage};
use docqa_core::config::RetrievalSettings;
use std::sync::Arc;

/// How a retrieval call ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalStatus {
    /// At least one passage cleared the confidence threshold
    Matched,
    /// No document produced a passage; the encoder was not called
    EmptyPool,
    /// The best score was below the threshold
    BelowThreshold { best: f32 },
    /// Encoding failed or returned unusable vectors
    Failed(FailureKind),
}

/// Ranked passages, strictly descending by score, or empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub passages: Vec<ScoredPassage>,
    pub status: RetrievalStatus,
}

impl RetrievalResult {
    fn empty(status: RetrievalStatus) -> Self {
        Self {
            passages: Vec::new(),
            status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Highest score among the returned passages.
    pub fn best_score(&self) -> Option<f32> {
        self.passages.first().map(|p| p.score)
    }
}

/// Chunk every document and keep its first `max_passages_per_document`
/// passages, in corpus order.
pub fn candidate_pool(documents: &[Document], settings: &RetrievalSettings) -> Vec<Passage> {
    documents
        .iter()
        .flat_map(|doc| {
            chunker::split(&doc.text, settings.target_chunk_size, settings.segmentation)
                .into_iter()
                .take(settings.max_passages_per_document)
                .enumerate()
                .map(move |(i, text)| Passage::new(&doc.name, i, text))
        })
        .collect()
}

/// Indices of the `k` highest scores, descending.
///
/// The sort is stable, so equal scores keep pool order. NaN and infinite
/// scores rank below every finite score.
pub fn select_top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let key = |s: f32| if s.is_finite() { s } else { f32::NEG_INFINITY };

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| key(scores[b]).total_cmp(&key(scores[a])));
    indices.truncate(k);
    indices
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Ranks passages against a query with a shared encoder.
#[derive(Debug, Clone)]
pub struct Retriever {
    encoder: Arc<dyn EmbeddingProvider>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(encoder: Arc<dyn EmbeddingProvider>, settings: RetrievalSettings) -> Self {
        Self { encoder, settings }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Retrieve at most `top_k` passages relevant to `query`.
    pub async fn retrieve(&self, query: &str, documents: &[Document]) -> RetrievalResult {
        let pool = candidate_pool(documents, &self.settings);
        if pool.is_empty() {
            tracing::info!("Candidate pool is empty");
            return RetrievalResult::empty(RetrievalStatus::EmptyPool);
        }

        let query_vector = match self.encoder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to embed query");
                return RetrievalResult::empty(RetrievalStatus::Failed(FailureKind::Encoder));
            }
        };

        let texts: Vec<String> = pool.iter().map(|p| p.text.clone()).collect();
        let passage_vectors = match self.encoder.embed_batch(&texts).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, passages = texts.len(), "Failed to embed passages");
                return RetrievalResult::empty(RetrievalStatus::Failed(FailureKind::Encoder));
            }
        };

        if passage_vectors.len() != pool.len() {
            tracing::warn!(
                expected = pool.len(),
                got = passage_vectors.len(),
                "Encoder returned the wrong number of vectors"
            );
            return RetrievalResult::empty(RetrievalStatus::Failed(FailureKind::EmbeddingCount));
        }
        if let Some(bad) = passage_vectors
            .iter()
            .find(|v| v.len() != query_vector.len())
        {
            tracing::warn!(
                query = query_vector.len(),
                passage = bad.len(),
                "Embedding dimensions differ"
            );
            return RetrievalResult::empty(RetrievalStatus::Failed(FailureKind::DimensionMismatch));
        }

        let scores: Vec<f32> = passage_vectors
            .iter()
            .map(|v| dot(v, &query_vector))
            .collect();
        let selected = select_top_k(&scores, self.settings.top_k);

        let best = selected.first().map(|&i| scores[i]).unwrap_or(f32::NAN);
        tracing::debug!(
            pool = pool.len(),
            selected = selected.len(),
            best,
            threshold = self.settings.confidence_threshold,
            "Scored candidate pool"
        );

        // NaN fails this comparison too
        if !(best >= self.settings.confidence_threshold) {
            tracing::info!(best, "Best match below confidence threshold");
            return RetrievalResult::empty(RetrievalStatus::BelowThreshold { best });
        }

        let mut pool: Vec<Option<Passage>> = pool.into_iter().map(Some).collect();
        let passages = selected
            .into_iter()
            .filter_map(|i| {
                pool[i].take().map(|passage| ScoredPassage {
                    passage,
                    score: scores[i],
                })
            })
            .collect();

        RetrievalResult {
            passages,
            status: RetrievalStatus::Matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedEmbeddings;

    fn settings() -> RetrievalSettings {
        RetrievalSettings::default()
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("A", "The sky is blue. Grass is green."),
            Document::new("B", "Invoices are due in thirty days."),
            Document::new("C", "Sky diving requires training."),
        ]
    }

    #[test]
    fn test_select_top_k_stable_and_descending() {
        let scores = [0.2, 0.9, 0.5, 0.9, f32::NAN, 0.1];
        assert_eq!(select_top_k(&scores, 3), vec![1, 3, 2]);
        assert_eq!(select_top_k(&scores, 10), vec![1, 3, 2, 0, 5, 4]);
        assert!(select_top_k(&scores, 0).is_empty());
        assert!(select_top_k(&[], 3).is_empty());
    }

    #[test]
    fn test_candidate_pool_caps_per_document() {
        let docs = vec![
            Document::new("long", "a".repeat(12_000)),
            Document::new("short", "The sky is blue."),
        ];

        let pool = candidate_pool(&docs, &settings());
        assert_eq!(pool.len(), 6);
        assert_eq!(pool[0].label, "long (chunk 1)");
        assert_eq!(pool[4].label, "long (chunk 5)");
        assert_eq!(pool[5].label, "short (chunk 1)");
        assert!(pool.iter().all(|p| p.text.chars().count() <= 1000));
    }

    #[tokio::test]
    async fn test_retrieve_ranks_and_labels() {
        let encoder = Arc::new(
            FixedEmbeddings::new(vec![0.0, 0.0, 1.0])
                .with_rule("sky is", vec![1.0, 0.0, 0.0])
                .with_rule("sky diving", vec![0.6, 0.8, 0.0])
                .with_rule("sky", vec![1.0, 0.0, 0.0]),
        );
        let retriever = Retriever::new(encoder.clone(), settings());

        let result = retriever.retrieve("What color is the sky?", &docs()).await;

        assert_eq!(result.status, RetrievalStatus::Matched);
        assert_eq!(result.passages.len(), 3);
        assert_eq!(result.passages[0].passage.label, "A (chunk 1)");
        assert_eq!(result.passages[1].passage.label, "C (chunk 1)");
        assert!(result
            .passages
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        // One query embedding plus one batch for the pool
        assert_eq!(encoder.calls(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let encoder = Arc::new(FixedEmbeddings::new(vec![1.0, 0.0]));
        let mut settings = settings();
        settings.top_k = 2;

        let result = Retriever::new(encoder, settings)
            .retrieve("anything", &docs())
            .await;

        // All scores tie at 1.0, so pool order decides
        let labels: Vec<_> = result.passages.iter().map(|p| p.passage.label.as_str()).collect();
        assert_eq!(labels, vec!["A (chunk 1)", "B (chunk 1)"]);
    }

    #[tokio::test]
    async fn test_below_threshold_is_empty() {
        let encoder = Arc::new(
            FixedEmbeddings::new(vec![1.0, 0.0]).with_rule("volcano", vec![0.0, 1.0]),
        );
        let result = Retriever::new(encoder, settings())
            .retrieve("How do volcanoes form?", &docs())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.status, RetrievalStatus::BelowThreshold { best: 0.0 });
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let encoder = Arc::new(
            FixedEmbeddings::new(vec![1.0, 0.0]).with_rule("query", vec![0.25, 0.0]),
        );
        let result = Retriever::new(encoder, settings())
            .retrieve("query", &docs()[..1])
            .await;

        assert_eq!(result.status, RetrievalStatus::Matched);
        assert_eq!(result.best_score(), Some(0.25));
    }

    #[tokio::test]
    async fn test_empty_pool_skips_encoder() {
        let encoder = Arc::new(FixedEmbeddings::new(vec![1.0]));
        let docs = vec![Document::new("blank", "   ")];

        let result = Retriever::new(encoder.clone(), settings())
            .retrieve("sky", &docs)
            .await;

        assert_eq!(result.status, RetrievalStatus::EmptyPool);
        assert_eq!(encoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_encoder_failure_is_reported() {
        let encoder = Arc::new(FixedEmbeddings::new(vec![1.0]).failing());
        let result = Retriever::new(encoder, settings())
            .retrieve("sky", &docs())
            .await;

        assert!(result.is_empty());
        assert_eq!(result.status, RetrievalStatus::Failed(FailureKind::Encoder));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_reported() {
        let encoder = Arc::new(
            FixedEmbeddings::new(vec![1.0, 0.0]).with_rule("question", vec![1.0, 0.0, 0.0]),
        );
        let result = Retriever::new(encoder, settings())
            .retrieve("question", &docs())
            .await;

        assert_eq!(
            result.status,
            RetrievalStatus::Failed(FailureKind::DimensionMismatch)
        );
    }

    #[tokio::test]
    async fn test_wrong_vector_count_is_reported() {
        let encoder = Arc::new(FixedEmbeddings::new(vec![1.0]).dropping_last());
        let result = Retriever::new(encoder, settings())
            .retrieve("sky", &docs())
            .await;

        assert_eq!(
            result.status,
            RetrievalStatus::Failed(FailureKind::EmbeddingCount)
        );
    }
}
