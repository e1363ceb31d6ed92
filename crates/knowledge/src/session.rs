//! Interactive question loop.
//!
//! Reads one question per line, answers it fully, prints the answer and
//! waits for the next line. An empty line or end of input ends the session.
//! Per-query failures are logged and the loop carries on.

use crate::rag::{AnswerOutcome, RagPipeline, Stage};
use docqa_core::AppResult;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Printed before each question is read.
pub const PROMPT: &str = "Question (empty line to quit): ";

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitQuery,
    Busy(Stage),
    Responded,
    Finished,
}

/// Counts of how the session's queries ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub queries: usize,
    pub answered: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// One interactive session over a pipeline.
#[derive(Debug)]
pub struct Session<'a> {
    pipeline: &'a RagPipeline,
    max_display_chars: usize,
    history: Vec<SessionState>,
}

impl<'a> Session<'a> {
    pub fn new(pipeline: &'a RagPipeline, max_display_chars: usize) -> Self {
        Self {
            pipeline,
            max_display_chars,
            history: Vec::new(),
        }
    }

    /// Every state the session has entered, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    fn enter(&mut self, state: SessionState) {
        tracing::debug!(?state, "Session state");
        self.history.push(state);
    }

    /// Run until an empty line or end of input.
    ///
    /// Only I/O errors on `input` or `output` end the session early.
    pub async fn run<R, W>(&mut self, mut input: R, mut output: W) -> AppResult<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let pipeline = self.pipeline;
        let mut summary = SessionSummary::default();
        let mut line = String::new();

        loop {
            self.enter(SessionState::AwaitQuery);
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            line.clear();
            let read = input.read_line(&mut line).await?;
            let query = line.trim();
            if read == 0 || query.is_empty() {
                break;
            }

            summary.queries += 1;
            let outcome = pipeline
                .ask_observed(query, &mut |stage| self.enter(SessionState::Busy(stage)))
                .await;

            match &outcome {
                AnswerOutcome::Answered { sources, .. } => {
                    summary.answered += 1;
                    tracing::info!(sources = sources.len(), "Answered");
                }
                AnswerOutcome::NotFound => summary.not_found += 1,
                AnswerOutcome::Failed { kind } => {
                    summary.failed += 1;
                    tracing::error!(%kind, "Failed to answer question");
                }
            }

            let text = truncate_chars(outcome.text(), self.max_display_chars);
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n\n").await?;
            output.flush().await?;
            self.enter(SessionState::Responded);
        }

        self.enter(SessionState::Finished);
        tracing::info!(
            queries = summary.queries,
            answered = summary.answered,
            not_found = summary.not_found,
            failed = summary.failed,
            "Session finished"
        );

        Ok(summary)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, Document};
    use crate::rag::{ERROR_ANSWER, NOT_FOUND_ANSWER};
    use crate::testing::FixedEmbeddings;
    use docqa_core::AppConfig;
    use docqa_llm::ScriptedClient;
    use docqa_prompt::PromptBuilder;
    use std::sync::Arc;

    fn pipeline(client: ScriptedClient) -> RagPipeline {
        RagPipeline::new(
            Corpus::from_documents(vec![Document::new("A", "The sky is blue. Grass is green.")]),
            Arc::new(FixedEmbeddings::new(vec![0.0, 1.0]).with_rule("sky", vec![1.0, 0.0])),
            Arc::new(client),
            PromptBuilder::builtin(NOT_FOUND_ANSWER).unwrap(),
            &AppConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_line_ends_session() {
        let pipeline = pipeline(ScriptedClient::tokens(["Blue."]));
        let mut session = Session::new(&pipeline, 2000);
        let mut output = Vec::new();

        let summary = session.run(&b"\nsky?\n"[..], &mut output).await.unwrap();

        assert_eq!(summary, SessionSummary::default());
        assert_eq!(
            session.history(),
            &[SessionState::AwaitQuery, SessionState::Finished]
        );
        assert_eq!(String::from_utf8(output).unwrap(), PROMPT);
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let pipeline = pipeline(ScriptedClient::tokens(["Blue."]));
        let mut session = Session::new(&pipeline, 2000);
        let mut output = Vec::new();

        let summary = session.run(&b"sky?"[..], &mut output).await.unwrap();

        assert_eq!(summary.queries, 1);
        assert_eq!(summary.answered, 1);
        assert!(String::from_utf8(output).unwrap().contains("Blue.\n"));
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let pipeline = pipeline(ScriptedClient::tokens(["Blue."]));
        let mut session = Session::new(&pipeline, 2000);

        session
            .run(&b"sky?\nvolcanoes?\n\n"[..], Vec::<u8>::new())
            .await
            .unwrap();

        use SessionState::*;
        assert_eq!(
            session.history(),
            &[
                AwaitQuery,
                Busy(Stage::Retrieving),
                Busy(Stage::Generating),
                Busy(Stage::Cleaning),
                Responded,
                AwaitQuery,
                Busy(Stage::Retrieving),
                Busy(Stage::NoMatch),
                Responded,
                AwaitQuery,
                Finished,
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_end_session() {
        let pipeline = pipeline(ScriptedClient::failing("backend down"));
        let mut session = Session::new(&pipeline, 2000);
        let mut output = Vec::new();

        let summary = session
            .run(&b"sky?\nvolcanoes?\n\n"[..], &mut output)
            .await
            .unwrap();

        assert_eq!(summary.queries, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_found, 1);

        let printed = String::from_utf8(output).unwrap();
        let error_at = printed.find(ERROR_ANSWER).unwrap();
        let not_found_at = printed.find(NOT_FOUND_ANSWER).unwrap();
        assert!(error_at < not_found_at);
    }

    #[tokio::test]
    async fn test_answer_truncated_for_display() {
        let pipeline = pipeline(ScriptedClient::tokens(["sky ".repeat(200)]));
        let mut session = Session::new(&pipeline, 50);
        let mut output = Vec::new();

        session.run(&b"sky?\n"[..], &mut output).await.unwrap();

        let printed = String::from_utf8(output).unwrap();
        let answer = printed
            .split(PROMPT)
            .nth(1)
            .unwrap()
            .trim_end_matches('\n');
        assert_eq!(answer.chars().count(), 50);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 0), "");
    }
}
