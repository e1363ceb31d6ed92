//! Context assembly and extraction-artifact stripping.

use crate::types::ScoredPassage;
use docqa_core::{AppError, AppResult};
use regex::Regex;

/// Patterns left behind by text extraction, replaced with a space.
const SPACED_ARTIFACTS: &[&str] = &[
    // [page 3], [Page 12]
    r"(?i)\[\s*page\s+\d+\s*\]",
    // - 3 - on its own between whitespace
    r"(?:^|\s)-\s*\d{1,4}\s*-(?:\s|$)",
    // dotted leaders, optionally followed by a page number
    r"\.{4,}\s*\d*",
];

/// Patterns removed outright.
const INLINE_ARTIFACTS: &[&str] = &[
    // numeric footnote markers: [12]
    r"\[\d{1,3}\]",
    // superscript digits
    r"[\u{00B9}\u{00B2}\u{00B3}\u{2070}\u{2074}-\u{2079}]+",
];

/// Strips footnote markers, page-break markers and dotted leaders.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    spaced: Vec<Regex>,
    inline: Vec<Regex>,
    blanks: Regex,
}

impl ArtifactFilter {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Other(format!("Invalid artifact pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            spaced: SPACED_ARTIFACTS
                .iter()
                .map(|p| compile(p))
                .collect::<AppResult<_>>()?,
            inline: INLINE_ARTIFACTS
                .iter()
                .map(|p| compile(p))
                .collect::<AppResult<_>>()?,
            blanks: compile(r"[ \t]{2,}")?,
        })
    }

    /// Remove artifacts, collapse the space runs they leave, and trim.
    ///
    /// Removing one marker can expose another (`[[1]2]`), so rounds repeat
    /// until nothing matches. Every replacement shortens the text.
    pub fn strip(&self, text: &str) -> String {
        let mut out = text.to_string();

        loop {
            let next = self.round(&out);
            if next == out {
                return out.trim().to_string();
            }
            out = next;
        }
    }

    fn round(&self, text: &str) -> String {
        let mut out = text.to_string();

        for re in &self.spaced {
            out = re.replace_all(&out, " ").into_owned();
        }
        for re in &self.inline {
            out = re.replace_all(&out, "").into_owned();
        }

        self.blanks.replace_all(&out, " ").into_owned()
    }
}

/// Formats retrieved passages into one attributed context block.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    artifacts: ArtifactFilter,
}

impl ContextAssembler {
    pub fn new(artifacts: ArtifactFilter) -> Self {
        Self { artifacts }
    }

    /// `"<label>:\n<text>"` per passage, in ranking order, separated by a
    /// blank line. Empty input gives an empty string.
    pub fn assemble(&self, passages: &[ScoredPassage]) -> String {
        passages
            .iter()
            .map(|p| {
                format!(
                    "{}:\n{}",
                    p.passage.label,
                    self.artifacts.strip(&p.passage.text)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    fn scored(name: &str, index: usize, text: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            passage: Passage::new(name, index, text),
            score,
        }
    }

    #[test]
    fn test_strip_footnotes_and_superscripts() {
        let filter = ArtifactFilter::new().unwrap();
        assert_eq!(
            filter.strip("Revenue grew[12] by 4%² last year[3]."),
            "Revenue grew by 4% last year."
        );
    }

    #[test]
    fn test_strip_page_markers() {
        let filter = ArtifactFilter::new().unwrap();
        assert_eq!(
            filter.strip("end of clause. [page 3] Next clause"),
            "end of clause. Next clause"
        );
        assert_eq!(
            filter.strip("first part - 12 - second part"),
            "first part second part"
        );
        assert_eq!(filter.strip("Introduction.........4"), "Introduction");
    }

    #[test]
    fn test_strip_keeps_ordinary_text() {
        let filter = ArtifactFilter::new().unwrap();
        let text = "Rates rose 3-4% in 2021 [see annex]. Ranges like 10-20 stay. Ellipsis... too.";
        assert_eq!(filter.strip(text), text);
    }

    #[test]
    fn test_strip_is_idempotent() {
        let filter = ArtifactFilter::new().unwrap();
        let once = filter.strip("A[1]  - 2 -  B.....3 [page 4]C¹");
        assert_eq!(filter.strip(&once), once);
    }

    #[test]
    fn test_strip_removes_nested_markers() {
        let filter = ArtifactFilter::new().unwrap();
        let nested = (0..25).fold("[1]".to_string(), |inner, _| format!("[{}2]", inner));

        assert_eq!(filter.strip(&format!("Blue{} sky.", nested)), "Blue sky.");
        assert_eq!(filter.strip("See [[page 3]1] here"), "See here");
    }

    #[test]
    fn test_assemble_single_passage() {
        let assembler = ContextAssembler::new(ArtifactFilter::new().unwrap());
        let context = assembler.assemble(&[scored("A", 0, "The sky is blue. Grass is green.", 1.0)]);
        assert_eq!(context, "A (chunk 1):\nThe sky is blue. Grass is green.");
    }

    #[test]
    fn test_assemble_keeps_order_and_separates() {
        let assembler = ContextAssembler::new(ArtifactFilter::new().unwrap());
        let context = assembler.assemble(&[
            scored("B", 2, "Second[4] best.", 0.9),
            scored("A", 0, "Third best.", 0.4),
        ]);
        assert_eq!(context, "B (chunk 3):\nSecond best.\n\nA (chunk 1):\nThird best.");
    }

    #[test]
    fn test_assemble_empty() {
        let assembler = ContextAssembler::new(ArtifactFilter::new().unwrap());
        assert_eq!(assembler.assemble(&[]), "");
    }
}
