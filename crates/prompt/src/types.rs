//! Prompt types for docqa.
//!
//! This module defines the YAML-backed prompt definition and the metadata
//! describing a rendered prompt.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
///
/// The template is rendered with three variables: `context` (the assembled
/// passages), `query` (the user's question, verbatim) and `notFoundAnswer`
/// (the sentinel the model should reply with when the context is
/// insufficient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// A rendered prompt plus what went into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Text handed to the generator
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Context length in characters
    #[serde(rename = "contextChars")]
    pub context_chars: usize,

    /// Prompt length in characters
    #[serde(rename = "promptChars")]
    pub prompt_chars: usize,
}
