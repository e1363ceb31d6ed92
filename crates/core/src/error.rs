//! Error types for docqa.
//!
//! A single enum covers every error category in the workspace: configuration,
//! I/O, corpus loading, LLM backends, retrieval, prompts and serialization.
//! Per-query failures are converted into value-level outcomes at component
//! boundaries; only startup errors travel all the way up to `main`.

use thiserror::Error;

/// Unified error type for docqa.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus file missing or malformed
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Text-generation backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = AppError::Corpus("data.json not found".to_string());
        assert_eq!(err.to_string(), "Corpus error: data.json not found");

        let err = AppError::Llm("connection refused".to_string());
        assert_eq!(err.to_string(), "LLM error: connection refused");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<Vec<u32>, _> = serde_json::from_str("[1, 2,");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
