//! LLM integration crate for docqa.
//!
//! This crate provides a provider-agnostic abstraction for text generation
//! and the [`Generator`] that drives it under explicit control: prompt
//! truncation, sampling parameters and stop predicates.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use docqa_core::config::GenerationSettings;
//! use docqa_llm::{GenerationConfig, Generator, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Generator::new(Arc::new(OllamaClient::new()?));
//! let config = GenerationConfig::from_settings("llama3.2", &GenerationSettings::default());
//! let generation = generator.generate("Why is the sky blue?", &config).await?;
//! println!("{}", generation.text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generator;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use generator::{
    truncate_to_tail, AnyOf, DecodeMode, FinishReason, Generation, GenerationConfig, Generator,
    NeverStop, SamplingParams, StopPredicate, StopSequences,
};
pub use providers::OllamaClient;

#[cfg(any(test, feature = "testing"))]
pub use providers::ScriptedClient;
