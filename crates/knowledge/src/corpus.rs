//! Document corpus loading and inspection.
//!
//! The corpus is a JSON array of `{name, text, preview?}` objects written by
//! the extraction tooling. It is loaded once and held read-only.

use crate::chunker;
use docqa_core::config::RetrievalSettings;
use docqa_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Preview length in characters.
pub const PREVIEW_CHARS: usize = 100;

/// One extracted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            preview: None,
        }
    }

    /// Stored preview, or one derived from the text.
    pub fn preview(&self) -> String {
        match &self.preview {
            Some(preview) => preview.clone(),
            None => derive_preview(&self.text),
        }
    }
}

/// First `PREVIEW_CHARS` characters of the whitespace-collapsed text,
/// followed by `...` when the text is longer.
pub fn derive_preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut preview: String = collapsed.chars().take(PREVIEW_CHARS).collect();

    if collapsed.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

/// Per-document statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStats {
    pub name: String,
    pub chars: usize,
    /// Passages the document contributes to a candidate pool
    pub pool_passages: usize,
    /// Passages cut beyond the per-document cap
    pub dropped_passages: usize,
}

/// Corpus-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub total_chars: usize,
    pub empty_documents: usize,
    pub pool_size: usize,
    pub per_document: Vec<DocumentStats>,
}

/// The loaded document collection.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Load the corpus file.
    ///
    /// # Errors
    /// Returns `AppError::Corpus` if the file is missing or not a JSON array
    /// of documents.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Corpus(format!(
                "Corpus file not found: {:?}. Run the extraction step first.",
                path
            )));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Corpus(format!("Failed to read corpus {:?}: {}", path, e)))?;

        let documents: Vec<Document> = serde_json::from_str(&contents)
            .map_err(|e| AppError::Corpus(format!("Malformed corpus JSON in {:?}: {}", path, e)))?;

        let corpus = Self::from_documents(documents);
        tracing::info!(
            path = %path.display(),
            documents = corpus.len(),
            "Loaded corpus"
        );

        Ok(corpus)
    }

    /// Build a corpus, keeping the last entry for each name at the position
    /// of its first occurrence.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<Document> = Vec::with_capacity(documents.len());

        for document in documents {
            match positions.get(&document.name) {
                Some(&idx) => {
                    tracing::debug!(name = %document.name, "Duplicate document name, keeping the later entry");
                    unique[idx] = document;
                }
                None => {
                    positions.insert(document.name.clone(), unique.len());
                    unique.push(document);
                }
            }
        }

        Self { documents: unique }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// Documents whose text contains every keyword.
    ///
    /// Punctuation is stripped from the keywords and matching ignores case.
    /// A query with no keywords left matches every document.
    pub fn search(&self, query: &str) -> AppResult<Vec<&Document>> {
        let punctuation = Regex::new(r"[^\w\s]")
            .map_err(|e| AppError::Other(format!("Invalid keyword pattern: {}", e)))?;
        let keywords: Vec<String> = punctuation
            .replace_all(query, "")
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        tracing::debug!(?keywords, "Searching corpus");

        Ok(self
            .documents
            .iter()
            .filter(|d| {
                let text = d.text.to_lowercase();
                keywords.iter().all(|kw| text.contains(kw.as_str()))
            })
            .collect())
    }

    /// Size statistics, including the candidate pool each document produces
    /// under the given retrieval settings.
    pub fn stats(&self, settings: &RetrievalSettings) -> CorpusStats {
        let per_document: Vec<DocumentStats> = self
            .documents
            .iter()
            .map(|d| {
                let passages =
                    chunker::split(&d.text, settings.target_chunk_size, settings.segmentation).len();
                let pool_passages = passages.min(settings.max_passages_per_document);
                DocumentStats {
                    name: d.name.clone(),
                    chars: d.text.chars().count(),
                    pool_passages,
                    dropped_passages: passages - pool_passages,
                }
            })
            .collect();

        CorpusStats {
            documents: self.documents.len(),
            total_chars: per_document.iter().map(|d| d.chars).sum(),
            empty_documents: self
                .documents
                .iter()
                .filter(|d| d.text.trim().is_empty())
                .count(),
            pool_size: per_document.iter().map(|d| d.pool_passages).sum(),
            per_document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_corpus(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("data.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_corpus() {
        let temp = TempDir::new().unwrap();
        let path = write_corpus(
            &temp,
            r#"[
                {"name": "a.pdf", "text": "The sky is blue.", "preview": "The sky"},
                {"name": "b.docx", "text": "Grass is green."}
            ]"#,
        );

        let corpus = Corpus::load(&path).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents()[0].preview(), "The sky");
        assert_eq!(corpus.documents()[1].preview(), "Grass is green.");
    }

    #[test]
    fn test_missing_corpus_is_corpus_error() {
        let temp = TempDir::new().unwrap();
        let result = Corpus::load(&temp.path().join("data.json"));
        assert!(matches!(result, Err(AppError::Corpus(_))));
    }

    #[test]
    fn test_malformed_corpus_is_corpus_error() {
        let temp = TempDir::new().unwrap();
        let path = write_corpus(&temp, r#"{"name": "not an array"}"#);
        assert!(matches!(Corpus::load(&path), Err(AppError::Corpus(_))));

        let path = write_corpus(&temp, "[{\"name\": ");
        assert!(matches!(Corpus::load(&path), Err(AppError::Corpus(_))));
    }

    #[test]
    fn test_record_without_text_is_corpus_error() {
        let temp = TempDir::new().unwrap();
        let path = write_corpus(
            &temp,
            r#"[{"name": "a.pdf", "text": "The sky is blue."}, {"name": "b.pdf"}]"#,
        );

        match Corpus::load(&path) {
            Err(AppError::Corpus(message)) => assert!(message.contains("text")),
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_names_last_wins_at_first_position() {
        let corpus = Corpus::from_documents(vec![
            Document::new("a", "old"),
            Document::new("b", "bee"),
            Document::new("a", "new"),
        ]);

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents()[0].name, "a");
        assert_eq!(corpus.documents()[0].text, "new");
        assert_eq!(corpus.get("b").unwrap().text, "bee");
    }

    #[test]
    fn test_derive_preview() {
        assert_eq!(derive_preview("  short\n\ttext "), "short text");

        let long = "x".repeat(150);
        let preview = derive_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));

        let exact = "y".repeat(PREVIEW_CHARS);
        assert_eq!(derive_preview(&exact), exact);
    }

    #[test]
    fn test_search_requires_all_keywords() {
        let corpus = Corpus::from_documents(vec![
            Document::new("contract.pdf", "Payment is due within 30 days of delivery."),
            Document::new("invoice.xlsx", "Payment received. Thank you!"),
        ]);

        let hits = corpus.search("payment, DELIVERY!").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "contract.pdf");

        assert_eq!(corpus.search("payment").unwrap().len(), 2);
        assert!(corpus.search("refund").unwrap().is_empty());
        assert_eq!(corpus.search("?!").unwrap().len(), 2);
    }

    #[test]
    fn test_search_unicode_keywords() {
        let corpus = Corpus::from_documents(vec![Document::new(
            "отчет.docx",
            "Срок оплаты составляет тридцать дней.",
        )]);

        assert_eq!(corpus.search("Оплаты?").unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let corpus = Corpus::from_documents(vec![
            Document::new("long", "a".repeat(12_000)),
            Document::new("short", "The sky is blue."),
            Document::new("empty", "   "),
        ]);

        let stats = corpus.stats(&RetrievalSettings::default());
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.empty_documents, 1);
        assert_eq!(stats.total_chars, 12_000 + 16 + 3);
        assert_eq!(stats.per_document[0].pool_passages, 5);
        assert_eq!(stats.per_document[0].dropped_passages, 7);
        assert_eq!(stats.per_document[1].pool_passages, 1);
        assert_eq!(stats.per_document[2].pool_passages, 0);
        assert_eq!(stats.pool_size, 6);
    }
}
