//! Ask command handler.
//!
//! Answers a single question from the corpus and exits.

use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::AnswerOutcome;

use super::build_pipeline;

/// Ask a single question about the documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// List the passages the answer was drawn from
    #[arg(long)]
    pub show_sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let pipeline = build_pipeline(config).await?;
        let outcome = pipeline.ask(question).await;

        if let AnswerOutcome::Failed { kind } = &outcome {
            tracing::error!(%kind, "Failed to answer question");
        }

        if self.json {
            let output = serde_json::json!({
                "question": question,
                "answer": outcome.text(),
                "result": outcome,
                "model": config.llm.model,
                "provider": config.llm.provider,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", outcome.text());

        if self.show_sources && !outcome.sources().is_empty() {
            println!();
            println!("Sources:");
            for source in outcome.sources() {
                println!("  - {} (score {:.3})", source.label, source.score);
            }
        }

        Ok(())
    }
}
