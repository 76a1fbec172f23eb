//! Narrative summary quality check and rule-based summary
//!
//! # Validity
//! A generated summary is accepted when it:
//! 1. is non-empty
//! 2. is at least 40% alphabetic characters
//! 3. contains only printable ASCII plus tab/newline/carriage return
//! 4. has at least 8 words
//!
//! # Template
//! Built from the captions alone, so it works with every collaborator down.
//! The phrasing depends on how many captions survived captioning. Up to five
//! are named in full; past that the remainder is counted.

const MIN_ALPHA_RATIO: f32 = 0.4;
const MIN_SUMMARY_WORDS: usize = 8;
/// Captions named in a template summary before the rest are only counted
const MAX_NAMED_CAPTIONS: usize = 5;

/// True for characters a summary or lyrics sheet may contain
pub(crate) fn is_allowed_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r' | ' '..='~')
}

/// Check a collaborator summary against the quality rules
pub fn is_valid_summary(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    let total = text.chars().count().max(1);
    let alpha = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if (alpha as f32 / total as f32) < MIN_ALPHA_RATIO {
        return false;
    }

    if !text.chars().all(is_allowed_char) {
        return false;
    }

    text.split_whitespace().count() >= MIN_SUMMARY_WORDS
}

/// Rule-based summary from the photo captions
pub fn template_summary(captions: &[String]) -> String {
    let cleaned: Vec<String> = captions
        .iter()
        .map(|c| clean_caption(c))
        .filter(|c| !c.is_empty())
        .collect();

    match cleaned.as_slice() {
        [] => "A collection of family photos, gathered to remember the people and places \
               that matter most. Each moment holds the warmth and connection that make \
               these memories precious."
            .to_string(),
        [only] => format!(
            "This image shows {}. A precious moment capturing the warmth and connection \
             of family memories.",
            only
        ),
        [first, second] => format!(
            "These images capture {} and {}. Together they tell a story of family bonds \
             and cherished moments.",
            first, second
        ),
        [.., last] => {
            let named = cleaned.len().min(MAX_NAMED_CAPTIONS);
            let listed = if named == cleaned.len() {
                format!("{}, and {}", cleaned[..named - 1].join(", "), last)
            } else {
                format!(
                    "{}, and {} more",
                    cleaned[..named].join(", "),
                    cleaned.len() - named
                )
            };
            format!(
                "These photos show {}. Each image captures the love, joy, and connection \
                 that define these precious family memories. Across all {} photos, one \
                 family story unfolds.",
                listed,
                cleaned.len()
            )
        }
    }
}

/// Strip non-ASCII and trailing punctuation so a caption reads inside a sentence
fn clean_caption(caption: &str) -> String {
    let ascii: String = caption
        .chars()
        .filter(|c| *c != '\t' && *c != '\r' && *c != '\n')
        .filter(|c| is_allowed_char(*c))
        .collect();
    ascii
        .trim()
        .trim_end_matches(&['.', '!', '?'][..])
        .trim()
        .to_string()
}
