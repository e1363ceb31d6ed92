//! Chat command handler.
//!
//! Interactive loop: one question per line until an empty line or EOF.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::Session;
use tokio::io::BufReader;

use super::build_pipeline;

/// Ask questions interactively
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Maximum characters printed per answer (default: from config)
    #[arg(long)]
    pub max_display_chars: Option<usize>,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = build_pipeline(config).await?;
        let max_display_chars = self
            .max_display_chars
            .unwrap_or(config.session.max_display_chars);

        let mut session = Session::new(&pipeline, max_display_chars);
        let summary = session
            .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;

        tracing::debug!(?summary, "Chat ended");
        Ok(())
    }
}
