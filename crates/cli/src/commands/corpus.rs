//! Corpus command handler.
//!
//! Inspects the extracted document corpus without calling any model.

use clap::{Args, Subcommand};
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{Corpus, Document};

/// Inspect the document corpus
#[derive(Args, Debug)]
pub struct CorpusCommand {
    #[command(subcommand)]
    pub action: CorpusAction,
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// List documents with a short preview
    List(CorpusListCommand),
    /// Find documents containing all keywords
    Search(CorpusSearchCommand),
    /// Show corpus and candidate pool statistics
    Stats(CorpusStatsCommand),
}

impl CorpusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let corpus = Corpus::load(&config.corpus_file())?;

        match &self.action {
            CorpusAction::List(cmd) => cmd.execute(&corpus),
            CorpusAction::Search(cmd) => cmd.execute(&corpus),
            CorpusAction::Stats(cmd) => cmd.execute(&corpus, config),
        }
    }
}

/// List documents
#[derive(Args, Debug)]
pub struct CorpusListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusListCommand {
    fn execute(&self, corpus: &Corpus) -> AppResult<()> {
        tracing::info!("Executing corpus list command");
        print_documents(corpus.documents().iter(), self.json)
    }
}

/// Search documents by keywords
#[derive(Args, Debug)]
pub struct CorpusSearchCommand {
    /// Keywords; every one must appear in the document text
    #[arg(required = true, num_args = 1..)]
    pub keywords: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusSearchCommand {
    fn execute(&self, corpus: &Corpus) -> AppResult<()> {
        tracing::info!("Executing corpus search command");

        let query = self.keywords.join(" ");
        let matches = corpus.search(&query)?;
        tracing::debug!(matches = matches.len(), "Corpus search finished");

        if matches.is_empty() && !self.json {
            println!("No documents match: {}", query);
            return Ok(());
        }

        print_documents(matches.into_iter(), self.json)
    }
}

/// Corpus statistics
#[derive(Args, Debug)]
pub struct CorpusStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CorpusStatsCommand {
    fn execute(&self, corpus: &Corpus, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing corpus stats command");

        let stats = corpus.stats(&config.retrieval);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Documents:       {}", stats.documents);
        println!("Empty documents: {}", stats.empty_documents);
        println!("Total chars:     {}", stats.total_chars);
        println!(
            "Pool size:       {} (chunk size {}, at most {} per document)",
            stats.pool_size,
            config.retrieval.target_chunk_size,
            config.retrieval.max_passages_per_document
        );

        if !stats.per_document.is_empty() {
            println!();
            for doc in &stats.per_document {
                println!(
                    "  {}: {} chars, {} passages{}",
                    doc.name,
                    doc.chars,
                    doc.pool_passages,
                    if doc.dropped_passages > 0 {
                        format!(" ({} dropped)", doc.dropped_passages)
                    } else {
                        String::new()
                    }
                );
            }
        }

        Ok(())
    }
}

fn print_documents<'a>(documents: impl Iterator<Item = &'a Document>, json: bool) -> AppResult<()> {
    if json {
        let output: Vec<_> = documents
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "chars": d.text.chars().count(),
                    "preview": d.preview(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for document in documents {
        println!("{}", document.name);
        println!("  {}", document.preview());
    }

    Ok(())
}
