//! Splitting document text into bounded passages.
//!
//! Text is cut into atomic units (Unicode sentences, or fixed-width character
//! slices) and consecutive units are packed greedily, joined by one space,
//! while the passage stays within the target size. All lengths are counted in
//! characters, never bytes.

pub use docqa_core::config::Segmentation;
use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into passages of at most `target_size` characters.
///
/// A single unit longer than `target_size` is emitted whole as its own
/// passage. When sentence segmentation finds no boundary at all and the text
/// is longer than `target_size`, fixed-width slices are used instead.
/// Passages are never empty, and no text other than whitespace is dropped.
pub fn split(text: &str, target_size: usize, mode: Segmentation) -> Vec<String> {
    let target_size = target_size.max(1);

    let units = match mode {
        Segmentation::Sentence => {
            let sentences = sentence_units(text);
            if sentences.len() == 1 && sentences[0].chars().count() > target_size {
                tracing::debug!(
                    chars = sentences[0].chars().count(),
                    "No sentence boundaries found, falling back to fixed-width slices"
                );
                fixed_width_units(text, target_size)
            } else {
                sentences
            }
        }
        Segmentation::FixedWidth => fixed_width_units(text, target_size),
    };

    pack(units, target_size)
}

/// Sentences per UAX #29, trimmed, without empty pieces.
fn sentence_units(text: &str) -> Vec<&str> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Consecutive slices of `width` characters, trimmed, without empty pieces.
fn fixed_width_units(text: &str, width: usize) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == width {
            units.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        units.push(&text[start..]);
    }

    units
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Greedily join units while the running length fits.
fn pack(units: Vec<&str>, target_size: usize) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for unit in units {
        let unit_len = unit.chars().count();

        if current.is_empty() {
            current.push_str(unit);
            current_len = unit_len;
        } else if current_len + 1 + unit_len <= target_size {
            current.push(' ');
            current.push_str(unit);
            current_len += 1 + unit_len;
        } else {
            passages.push(std::mem::take(&mut current));
            current.push_str(unit);
            current_len = unit_len;
        }
    }

    if !current.is_empty() {
        passages.push(current);
    }

    passages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_short_text_single_passage() {
        let passages = split("The sky is blue. Grass is green.", 1000, Segmentation::Sentence);
        assert_eq!(passages, vec!["The sky is blue. Grass is green.".to_string()]);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        assert!(split("", 100, Segmentation::Sentence).is_empty());
        assert!(split(" \n\t ", 100, Segmentation::Sentence).is_empty());
        assert!(split(" \n\t ", 100, Segmentation::FixedWidth).is_empty());
    }

    #[test]
    fn test_sentences_packed_within_target() {
        let text = "One two three. Four five six. Seven eight nine. Ten eleven twelve.";
        let passages = split(text, 30, Segmentation::Sentence);

        assert_eq!(
            passages,
            vec![
                "One two three. Four five six.".to_string(),
                "Seven eight nine.".to_string(),
                "Ten eleven twelve.".to_string(),
            ]
        );
        for p in &passages {
            assert!(p.chars().count() <= 30);
        }
    }

    #[test]
    fn test_oversized_sentence_emitted_whole() {
        let long = format!("{}.", "Word ".repeat(40).trim());
        let text = format!("Short one. {} Short two.", long);
        let passages = split(&text, 50, Segmentation::Sentence);

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[1], long);
        assert!(passages[1].chars().count() > 50);
    }

    #[test]
    fn test_boundaryless_text_falls_back_to_fixed_width() {
        let text = "a".repeat(12_000);
        let passages = split(&text, 1000, Segmentation::Sentence);

        assert_eq!(passages.len(), 12);
        assert!(passages.iter().all(|p| p.chars().count() == 1000));
    }

    #[test]
    fn test_fixed_width_respects_char_boundaries() {
        let text = "äöü€".repeat(10);
        let passages = split(&text, 7, Segmentation::FixedWidth);

        assert!(passages.iter().all(|p| p.chars().count() <= 7));
        assert_eq!(passages.concat(), text);
    }

    #[test]
    fn test_concatenation_reproduces_text() {
        let text = "Payment terms.\n\nThe buyer pays within 30 days. Late payments accrue interest \
                    at 1% per month!  Disputes go to arbitration? Yes. "
            .repeat(20);

        for mode in [Segmentation::Sentence, Segmentation::FixedWidth] {
            for size in [1, 10, 64, 1000] {
                let passages = split(&text, size, mode);
                assert_eq!(
                    without_whitespace(&passages.concat()),
                    without_whitespace(&text),
                    "mode {:?} size {}",
                    mode,
                    size
                );
                assert!(passages.iter().all(|p| !p.is_empty()));
            }
        }
    }

    #[test]
    fn test_no_passage_exceeds_target_unless_single_unit() {
        let text = "Short. ".repeat(50) + &"X".repeat(80) + ". More text here.";
        let passages = split(&text, 40, Segmentation::Sentence);

        for p in &passages {
            let len = p.chars().count();
            if len > 40 {
                // Only the oversized sentence may exceed the target
                assert_eq!(sentence_units(p).len(), 1);
            }
        }
    }

    #[test]
    fn test_zero_target_treated_as_one() {
        let passages = split("ab", 0, Segmentation::FixedWidth);
        assert_eq!(passages, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta. ".repeat(30);
        assert_eq!(
            split(&text, 100, Segmentation::Sentence),
            split(&text, 100, Segmentation::Sentence)
        );
    }
}
