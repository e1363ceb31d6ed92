//! Embedding providers.
//!
//! Vectors are attached to a query or passage for one retrieval call only;
//! nothing is cached across calls.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, normalize, EmbeddingProvider};
