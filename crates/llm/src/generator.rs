//! Controlled text generation.
//!
//! [`Generator`] sits between the prompt and an [`LlmClient`] backend. It
//! caps the prompt to a character budget by keeping its tail, validates and
//! forwards the sampling parameters, and consumes the token stream until the
//! backend finishes, the token budget runs out, or a [`StopPredicate`] fires.
//! It never interprets the generated content.

use crate::client::{LlmClient, LlmRequest, LlmUsage};
use docqa_core::config::GenerationSettings;
use docqa_core::{AppError, AppResult};
use futures::StreamExt;
use std::sync::Arc;

/// What the generator returns as text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Only the newly generated text
    #[default]
    Continuation,
    /// The (possibly truncated) prompt followed by the continuation
    WithPrompt,
}

/// Sampling parameters forwarded to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl SamplingParams {
    /// Reject parameters the backend would silently clamp or misread.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_new_tokens == 0 {
            return Err(AppError::Llm("max_new_tokens must be at least 1".to_string()));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(AppError::Llm(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(AppError::Llm(format!(
                "top_p must be within (0, 1], got {}",
                self.top_p
            )));
        }
        if !(self.repetition_penalty.is_finite() && self.repetition_penalty > 0.0) {
            return Err(AppError::Llm(format!(
                "repetition_penalty must be positive, got {}",
                self.repetition_penalty
            )));
        }
        Ok(())
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        let settings = GenerationSettings::default();
        Self {
            max_new_tokens: settings.max_new_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            repetition_penalty: settings.repetition_penalty,
        }
    }
}

/// Per-call generation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    /// Prompt cap in characters
    pub max_prompt_length: usize,
    pub sampling: SamplingParams,
    /// Strings that end generation; they are cut from the output
    pub stop_sequences: Vec<String>,
    pub decode_mode: DecodeMode,
}

impl GenerationConfig {
    /// Build a configuration from the `generation` settings section.
    pub fn from_settings(model: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            model: model.into(),
            max_prompt_length: settings.max_prompt_length,
            sampling: SamplingParams {
                max_new_tokens: settings.max_new_tokens,
                temperature: settings.temperature,
                top_p: settings.top_p,
                repetition_penalty: settings.repetition_penalty,
            },
            stop_sequences: settings.stop_sequences.clone(),
            decode_mode: if settings.echo_prompt {
                DecodeMode::WithPrompt
            } else {
                DecodeMode::Continuation
            },
        }
    }
}

/// Decides after each emitted token whether generation should end.
pub trait StopPredicate: Send + Sync {
    /// `latest` is the token just emitted, `generated` the continuation so far
    /// (including `latest`).
    fn should_stop(&self, latest: &str, generated: &str) -> bool;
}

/// Never stops; generation ends at end-of-sequence or the token budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopPredicate for NeverStop {
    fn should_stop(&self, _latest: &str, _generated: &str) -> bool {
        false
    }
}

/// Stops once any configured sequence appears in the continuation.
#[derive(Debug, Clone, Default)]
pub struct StopSequences {
    sequences: Vec<String>,
}

impl StopSequences {
    pub fn new<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequences: sequences
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// Cut `text` at the earliest occurrence of any sequence.
    pub fn trim<'a>(&self, text: &'a str) -> &'a str {
        let cut = self
            .sequences
            .iter()
            .filter_map(|s| text.find(s.as_str()))
            .min();

        match cut {
            Some(pos) => &text[..pos],
            None => text,
        }
    }
}

impl StopPredicate for StopSequences {
    fn should_stop(&self, latest: &str, generated: &str) -> bool {
        // A sequence can only complete inside the window ending at `latest`
        self.sequences.iter().any(|s| {
            let window = s.len() + latest.len();
            let mut start = generated.len().saturating_sub(window);
            while !generated.is_char_boundary(start) {
                start -= 1;
            }
            generated[start..].contains(s.as_str())
        })
    }
}

/// Stops when any of the inner predicates does.
#[derive(Default)]
pub struct AnyOf {
    predicates: Vec<Arc<dyn StopPredicate>>,
}

impl AnyOf {
    pub fn new(predicates: Vec<Arc<dyn StopPredicate>>) -> Self {
        Self { predicates }
    }
}

impl StopPredicate for AnyOf {
    fn should_stop(&self, latest: &str, generated: &str) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_stop(latest, generated))
    }
}

/// Why generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Backend signalled end-of-sequence
    EndOfSequence,
    /// `max_new_tokens` tokens were emitted
    Length,
    /// A configured stop sequence appeared
    StopSequence,
    /// The custom stop predicate fired
    Predicate,
}

/// Result of one generation call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub finish_reason: FinishReason,
    pub prompt_truncated: bool,
    pub tokens: u32,
    pub usage: Option<LlmUsage>,
}

/// Keep the last `max_chars` characters of `text`.
///
/// Returns the retained slice and whether anything was dropped.
pub fn truncate_to_tail(text: &str, max_chars: usize) -> (&str, bool) {
    let total = text.chars().count();
    if total <= max_chars {
        return (text, false);
    }

    let skip = total - max_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (&text[start..], true)
}

/// Streams completions from a backend under explicit control.
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn LlmClient>,
    stop: Arc<dyn StopPredicate>,
}

impl Generator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            stop: Arc::new(NeverStop),
        }
    }

    /// Replace the custom stop predicate. Configured stop sequences are
    /// always honoured in addition to it.
    pub fn with_stop_predicate(mut self, stop: Arc<dyn StopPredicate>) -> Self {
        self.stop = stop;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Generate a completion for `prompt`.
    ///
    /// Backend and stream errors are returned as `AppError::Llm`.
    pub async fn generate(&self, prompt: &str, config: &GenerationConfig) -> AppResult<Generation> {
        config.sampling.validate()?;

        let (prompt, prompt_truncated) = truncate_to_tail(prompt, config.max_prompt_length);
        if prompt_truncated {
            tracing::warn!(
                max_prompt_length = config.max_prompt_length,
                "Prompt exceeds budget, keeping its tail"
            );
        }

        let sampling = &config.sampling;
        let request = LlmRequest::new(prompt, &config.model)
            .with_max_tokens(sampling.max_new_tokens)
            .with_temperature(sampling.temperature)
            .with_top_p(sampling.top_p)
            .with_repetition_penalty(sampling.repetition_penalty)
            .with_stop(config.stop_sequences.clone());

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %config.model,
            prompt_chars = prompt.chars().count(),
            "Starting generation"
        );

        let sequences = StopSequences::new(config.stop_sequences.iter().cloned());
        let mut stream = self.client.stream(&request).await?;
        let mut continuation = String::new();
        let mut tokens = 0u32;
        let mut usage = None;
        let mut finish_reason = FinishReason::EndOfSequence;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }

            if !chunk.content.is_empty() {
                continuation.push_str(&chunk.content);
                tokens += 1;

                if sequences.should_stop(&chunk.content, &continuation) {
                    finish_reason = FinishReason::StopSequence;
                    break;
                }
                if self.stop.should_stop(&chunk.content, &continuation) {
                    finish_reason = FinishReason::Predicate;
                    break;
                }
            }

            if chunk.done {
                break;
            }
            if tokens >= sampling.max_new_tokens {
                finish_reason = FinishReason::Length;
                break;
            }
        }
        // Dropping the stream closes the connection and stops the backend
        drop(stream);

        let continuation = sequences.trim(&continuation);
        tracing::debug!(
            tokens,
            finish_reason = ?finish_reason,
            chars = continuation.chars().count(),
            "Generation finished"
        );

        let text = match config.decode_mode {
            DecodeMode::Continuation => continuation.to_string(),
            DecodeMode::WithPrompt => format!("{}{}", prompt, continuation),
        };

        Ok(Generation {
            text,
            finish_reason,
            prompt_truncated,
            tokens,
            usage,
        })
    }
}
