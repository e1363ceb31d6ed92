//! LLM provider factory.
//!
//! Resolves the configured provider name to a client implementation. The
//! provider list is checked by `AppConfig::validate` as well, but the factory
//! stays authoritative so it can be called with hand-built settings.

use crate::client::LlmClient;
use crate::providers::ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
use docqa_core::config::LlmSettings;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client from the `llm` settings section.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown and `AppError::Llm`
/// if the HTTP client cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            tracing::debug!(endpoint = base_url, model = %settings.model, "Creating Ollama client");
            let client = OllamaClient::with_base_url(base_url, settings.timeout)?;
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!("Unknown LLM provider: {}", other))),
    }
}
