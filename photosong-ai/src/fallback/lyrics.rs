//! Lyrics quality check and rule-based lyrics
//!
//! Template lyrics reuse sentences and keywords from the summary so the
//! song still talks about the photos. Layout:
//!
//! ```text
//! [Verse 1]
//! ...
//!
//! [Chorus]
//! ...
//!
//! [Verse 2]
//! ...
//!
//! [Chorus]
//! ...
//! ```

use super::summary::is_allowed_char;
use crate::models::LyricsParameters;

const MIN_LYRICS_WORDS: usize = 20;
const KEYWORD_LIMIT: usize = 12;

const STOPWORDS: &[&str] = &[
    "the", "and", "with", "from", "that", "this", "those", "these", "into", "about", "their",
    "there", "they", "them", "we", "our", "ours", "your", "yours", "over", "under", "around",
    "were", "been", "have", "has", "had", "you", "for", "just", "like", "through",
];

const DEFAULT_KEYWORDS: &[&str] = &["memories", "family", "laughter", "home"];
const DEFAULT_SENTENCE: &str =
    "We gather together, sharing the stories that make this family ours.";

/// Check collaborator lyrics: verse and chorus markers, printable ASCII, 20+ words
pub fn is_valid_lyrics(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    if !text.contains("[Verse") || !text.contains("[Chorus]") {
        return false;
    }
    if !text.chars().all(is_allowed_char) {
        return false;
    }
    text.split_whitespace().count() >= MIN_LYRICS_WORDS
}

/// Rule-based lyrics from the summary, genre and mood
///
/// At least one verse of at least one line is always produced.
pub fn template_lyrics(
    summary: &str,
    genre: &str,
    mood: &str,
    shape: &LyricsParameters,
) -> String {
    let summary = ascii_only(summary);
    let genre = ascii_only(genre).trim().to_lowercase();
    let mood = ascii_only(mood).trim().to_string();
    let lines_per_verse = shape.lines_per_verse.max(1);
    let num_verses = shape.num_verses.max(1);

    let mut sentences = split_sentences(&summary);
    if sentences.is_empty() {
        sentences.push(DEFAULT_SENTENCE.to_string());
    }
    let keywords = extract_keywords(&summary, KEYWORD_LIMIT);

    let pair = if keywords.is_empty() {
        "Family memories".to_string()
    } else {
        keywords.iter().take(2).cloned().collect::<Vec<_>>().join(" and ")
    };

    let verses: Vec<String> = (0..num_verses)
        .map(|idx| {
            let sentence = &sentences[idx % sentences.len()];
            let base = [
                sentence.trim_end_matches('.').to_string(),
                format!("{} echoes in a {} sway.", capitalize(&mood), genre),
                format!("{} dance in the frame.", pair),
                "Holding to the quiet light of home.".to_string(),
            ];
            let lines = fill_lines(&base, lines_per_verse, &keywords, &mood);
            format!("[Verse {}]\n{}", idx + 1, lines.join("\n"))
        })
        .collect();

    let mood_lower = mood.to_lowercase();
    let chorus_base = [
        format!("Hold on to this {} glow tonight.", mood_lower),
        format!("Family hearts beating in a {} song.", genre),
        "Every laugh and tear we treasure tight.".to_string(),
        "Love keeps the rhythm, steady and strong.".to_string(),
    ];
    let chorus_len = lines_per_verse.clamp(4, 6);
    let chorus = format!(
        "[Chorus]\n{}",
        fill_lines(&chorus_base, chorus_len, &keywords, &mood).join("\n")
    );

    let mut sections = Vec::with_capacity(verses.len() + 2);
    for (idx, verse) in verses.into_iter().enumerate() {
        sections.push(verse);
        if idx == 0 {
            sections.push(chorus.clone());
        }
    }
    sections.push(chorus);

    sections.join("\n\n")
}

/// Up to `limit` distinct words of 3+ letters that are not stopwords, in order
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for token in word_tokens(text) {
        if keywords.len() >= limit {
            break;
        }
        if token.chars().count() < 3 || STOPWORDS.contains(&token.to_lowercase().as_str()) {
            continue;
        }
        if !keywords.contains(&token) {
            keywords.push(token);
        }
    }

    keywords
}

/// Words start with a letter and continue with letters, apostrophes or hyphens
fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let continues = !current.is_empty() && (ch == '\'' || ch == '-');
        if ch.is_ascii_alphabetic() || continues {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Split after `.`, `!` or `?` when followed by whitespace
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().map_or(false, |next| next.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Take base lines up to `target`, then pad with keyword lines
fn fill_lines(base: &[String], target: usize, keywords: &[String], mood: &str) -> Vec<String> {
    let mut lines: Vec<String> = base.iter().take(target).cloned().collect();

    let pool: Vec<String> = if keywords.is_empty() {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        keywords.to_vec()
    };

    let mood = mood.to_lowercase();
    let mut idx = 0;
    while lines.len() < target {
        let keyword = &pool[idx % pool.len()];
        lines.push(format!("{} in {} light we keep.", capitalize(keyword), mood));
        idx += 1;
    }

    lines
}

/// Uppercase the first letter, lowercase the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str().to_lowercase()),
        None => String::new(),
    }
}

fn ascii_only(text: &str) -> String {
    text.chars().filter(|c| is_allowed_char(*c)).collect()
}
