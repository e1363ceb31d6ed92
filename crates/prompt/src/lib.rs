//! Prompt system for docqa.
//!
//! This crate provides:
//! - YAML-based prompt definitions under `.docqa/prompts/`
//! - Handlebars rendering with HTML escaping disabled
//! - The built-in grounded answering template and its layout checks

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{PromptBuilder, BUILTIN_PROMPT_ID, DEFAULT_TEMPLATE};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
