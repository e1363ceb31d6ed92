//! Prompt builder for rendering grounded question-answering prompts.
//!
//! A template is compiled once and rendered per query. Before it is accepted,
//! the template is rendered with probe values to check that it references
//! both `context` and `query`, and that instructions come first, then the
//! context, then the query.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Identifier of the built-in template.
pub const BUILTIN_PROMPT_ID: &str = "builtin.grounded";

/// Built-in grounded answering template.
pub const DEFAULT_TEMPLATE: &str = "\
You answer questions about a collection of documents.
Use only the information in the context below. Do not rely on outside knowledge.
If the context does not contain the answer, reply exactly: {{notFoundAnswer}}
Keep the answer short and factual.

Context:
{{context}}

Question: {{query}}

Answer:";

const TEMPLATE_NAME: &str = "prompt";
const CONTEXT_PROBE: &str = "\u{1}docqa-context\u{1}";
const QUERY_PROBE: &str = "\u{1}docqa-query\u{1}";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptVariables<'a> {
    context: &'a str,
    query: &'a str,
    not_found_answer: &'a str,
}

/// Compiled prompt template.
pub struct PromptBuilder {
    id: String,
    not_found_answer: String,
    handlebars: Handlebars<'static>,
}

impl std::fmt::Debug for PromptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilder")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl PromptBuilder {
    /// Compile the built-in template.
    pub fn builtin(not_found_answer: impl Into<String>) -> AppResult<Self> {
        Self::compile(BUILTIN_PROMPT_ID, DEFAULT_TEMPLATE, not_found_answer.into())
    }

    /// Compile the template of a loaded prompt definition.
    pub fn from_definition(
        definition: &PromptDefinition,
        not_found_answer: impl Into<String>,
    ) -> AppResult<Self> {
        Self::compile(&definition.id, &definition.template, not_found_answer.into())
    }

    fn compile(id: &str, template: &str, not_found_answer: String) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain text: the query must reach the model verbatim
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template {}: {}", id, e)))?;

        let builder = Self {
            id: id.to_string(),
            not_found_answer,
            handlebars,
        };
        builder.validate_layout()?;

        tracing::debug!(prompt_id = id, "Compiled prompt template");
        Ok(builder)
    }

    /// Check the section order on a probe rendering.
    fn validate_layout(&self) -> AppResult<()> {
        let probe = self.render(QUERY_PROBE, CONTEXT_PROBE)?;

        let context_at = probe.find(CONTEXT_PROBE).ok_or_else(|| {
            AppError::Prompt(format!("Template {} does not reference {{{{context}}}}", self.id))
        })?;
        let query_at = probe.find(QUERY_PROBE).ok_or_else(|| {
            AppError::Prompt(format!("Template {} does not reference {{{{query}}}}", self.id))
        })?;

        if probe[..context_at].trim().is_empty() {
            return Err(AppError::Prompt(format!(
                "Template {} must start with instructions before the context",
                self.id
            )));
        }
        if query_at < context_at {
            return Err(AppError::Prompt(format!(
                "Template {} must place the query after the context",
                self.id
            )));
        }

        Ok(())
    }

    fn render(&self, query: &str, context: &str) -> AppResult<String> {
        let variables = PromptVariables {
            context,
            query,
            not_found_answer: &self.not_found_answer,
        };

        self.handlebars
            .render(TEMPLATE_NAME, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", self.id, e)))
    }

    /// Identifier of the compiled template.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render the prompt for one query.
    pub fn build(&self, query: &str, context: &str) -> AppResult<BuiltPrompt> {
        let text = self.render(query, context)?;

        let metadata = BuiltPromptMetadata {
            source_prompt_id: self.id.clone(),
            context_chars: context.chars().count(),
            prompt_chars: text.chars().count(),
        };
        tracing::debug!(
            prompt_id = %self.id,
            context_chars = metadata.context_chars,
            prompt_chars = metadata.prompt_chars,
            "Built prompt"
        );

        Ok(BuiltPrompt { text, metadata })
    }
}
