//! Sanitizing raw generator output into a bounded answer.

use crate::context::ArtifactFilter;
use docqa_core::config::CleanerSettings;
use docqa_core::{AppError, AppResult};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Extracts the answer span, strips artifacts and bounds the size.
#[derive(Debug, Clone)]
pub struct ResponseCleaner {
    markers: Vec<String>,
    max_sentences: usize,
    max_chars: usize,
    artifacts: ArtifactFilter,
    control: Regex,
}

impl ResponseCleaner {
    pub fn new(settings: &CleanerSettings, artifacts: ArtifactFilter) -> AppResult<Self> {
        let control = Regex::new(r"[\x00-\x1F\x7F]+")
            .map_err(|e| AppError::Other(format!("Invalid control pattern: {}", e)))?;

        Ok(Self {
            markers: settings
                .markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
            max_sentences: settings.max_sentences.max(1),
            max_chars: settings.max_chars.max(1),
            artifacts,
            control,
        })
    }

    /// Clean `raw`, applying the pass until the text stops changing, so
    /// `clean(clean(x)) == clean(x)`.
    ///
    /// A pass that changes the text either shortens it or replaces control
    /// characters with spaces, so the loop terminates.
    pub fn clean(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        let mut passes = 1;

        loop {
            let next = self.pass(&current);
            if next == current {
                tracing::trace!(passes, "Response cleaned");
                return current;
            }
            current = next;
            passes += 1;
        }
    }

    fn pass(&self, text: &str) -> String {
        let answer = self.after_last_marker(text);
        let stripped = self.artifacts.strip(answer);
        let flattened = self.control.replace_all(&stripped, " ");
        let bounded = self.bound(&flattened);
        bounded.trim().to_string()
    }

    /// Text after the latest occurrence of any marker, or all of it.
    fn after_last_marker<'a>(&self, text: &'a str) -> &'a str {
        self.markers
            .iter()
            .filter_map(|m| text.rfind(m.as_str()).map(|pos| (pos, pos + m.len())))
            .max_by_key(|&(start, _)| start)
            .map(|(_, end)| &text[end..])
            .unwrap_or(text)
    }

    /// First `max_sentences` sentences, then at most `max_chars` characters.
    fn bound<'a>(&self, text: &'a str) -> &'a str {
        let sentence_end = text
            .split_sentence_bound_indices()
            .nth(self.max_sentences)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        let text = &text[..sentence_end];

        match text.char_indices().nth(self.max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}
