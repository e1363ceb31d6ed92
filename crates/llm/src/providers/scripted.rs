//! Scripted LLM backend for tests.
//!
//! Replays a fixed token sequence (or fails) and records every request it
//! receives so tests can assert on the prompt and the call count.

use crate::client::{LlmClient, LlmRequest, LlmStream, LlmStreamChunk, LlmUsage};
use docqa_core::{AppError, AppResult};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Script {
    Tokens(Vec<String>),
    Fail(String),
    FailAfter(Vec<String>, String),
}

/// LLM client that replays scripted tokens.
#[derive(Debug)]
pub struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
    consumed: Arc<AtomicUsize>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    /// Stream the given tokens, then a final `done` chunk.
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Tokens(tokens.into_iter().map(Into::into).collect()))
    }

    /// Fail the request before any token is produced.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Stream the given tokens, then yield an error item.
    pub fn failing_after<I, S>(tokens: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::FailAfter(
            tokens.into_iter().map(Into::into).collect(),
            message.into(),
        ))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            consumed: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `stream` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of non-empty tokens pulled from all streams so far.
    pub fn tokens_consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

fn token_chunk(content: &str, model: &str) -> AppResult<LlmStreamChunk> {
    Ok(LlmStreamChunk {
        content: content.to_string(),
        model: model.to_string(),
        done: false,
        usage: None,
    })
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let model = request.model.as_str();
        let items: Vec<AppResult<LlmStreamChunk>> = match &self.script {
            Script::Fail(message) => return Err(AppError::Llm(message.clone())),
            Script::Tokens(tokens) => {
                let mut items: Vec<_> = tokens.iter().map(|t| token_chunk(t, model)).collect();
                items.push(Ok(LlmStreamChunk {
                    content: String::new(),
                    model: model.to_string(),
                    done: true,
                    usage: Some(LlmUsage::new(
                        request.prompt.split_whitespace().count() as u32,
                        tokens.len() as u32,
                    )),
                }));
                items
            }
            Script::FailAfter(tokens, message) => {
                let mut items: Vec<_> = tokens.iter().map(|t| token_chunk(t, model)).collect();
                items.push(Err(AppError::Llm(message.clone())));
                items
            }
        };

        let consumed = Arc::clone(&self.consumed);
        let stream = futures::stream::iter(items).inspect(move |item| {
            if matches!(item, Ok(chunk) if !chunk.content.is_empty()) {
                consumed.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(Box::pin(stream))
    }
}
