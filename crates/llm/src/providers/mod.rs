//! Text-generation backends.

pub mod ollama;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use ollama::OllamaClient;

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedClient;
