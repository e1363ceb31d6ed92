//! Test doubles shared by the unit and scenario tests.

use crate::embeddings::EmbeddingProvider;
use docqa_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Encoder returning scripted vectors.
///
/// The first rule whose keyword occurs in the text (ignoring case) supplies
/// the vector; texts matching no rule get the fallback vector.
#[derive(Debug)]
pub struct FixedEmbeddings {
    fallback: Vec<f32>,
    rules: Vec<(String, Vec<f32>)>,
    fail: bool,
    drop_last: bool,
    calls: AtomicUsize,
}

impl FixedEmbeddings {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            fallback,
            rules: Vec::new(),
            fail: false,
            drop_last: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rule(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.rules.push((keyword.to_lowercase(), vector));
        self
    }

    /// Every call fails.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Batches of more than one text lose their last vector.
    pub fn dropping_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.fallback.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(AppError::Knowledge("encoder unavailable".to_string()));
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last && vectors.len() > 1 {
            vectors.pop();
        }
        Ok(vectors)
    }
}
