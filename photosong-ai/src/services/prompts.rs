//! Prompt construction for the generative collaborators

use crate::models::{LyricsParameters, MusicParameters};
use crate::types::{MusicQuality, MusicRequest};

/// Instruction sent with every photo
pub const CAPTION_PROMPT: &str = "Describe the photo in rich detail.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a storyteller. Given a list of photo captions, \
     write a short, cohesive narrative summarizing the scene, people, and emotions that \
     connect these images.";

pub const LYRICS_SYSTEM_PROMPT: &str = "You are a professional songwriter. You write \
     structured, singable lyrics with clear verses and choruses, suitable for modern music.";

const MUSIC_NEGATIVE_PROMPT: &str = "low quality, distorted, noisy, off-key, harsh, clipping, \
     dissonant, amateur, poor recording, muddy, chaotic";

const THEME_WORDS: usize = 15;
const VOCAL_LINES: usize = 3;
const VOCAL_MAX_CHARS: usize = 250;

pub fn summary_user_prompt(captions: &[String]) -> String {
    let list: Vec<String> = captions.iter().map(|c| format!("- {}", c)).collect();
    format!(
        "Here are the captions for some family photos:\n\n{}\n\n\
         Write a 2-3 sentence narrative summary that captures the key moments, \
         people, and feelings. Make it personal and evocative.",
        list.join("\n")
    )
}

pub fn lyrics_user_prompt(
    summary: &str,
    genre: &str,
    mood: &str,
    shape: &LyricsParameters,
) -> String {
    format!(
        "I have this story summary of some family photos:\n\n{summary}\n\n\
         Write song lyrics based on this story.\n\n\
         Constraints:\n\
         - Genre feel: {genre}\n\
         - Mood: {mood}\n\
         - Structure: {verses} verses + 1 chorus that repeats\n\
         - Around {lines} lines per verse, 4-6 lines for the chorus\n\
         - Make it nostalgic, specific, and visual, referencing scenes from the story\n\
         - Avoid profanity, keep it family-friendly\n\n\
         Format EXACTLY like this:\n\n\
         [Verse 1]\n...\n\n[Chorus]\n...\n\n[Verse 2]\n...\n\n\
         Don't add explanations before or after the lyrics.",
        summary = summary,
        genre = genre,
        mood = mood,
        verses = shape.num_verses,
        lines = shape.lines_per_verse,
    )
}

/// Remove `[Verse N]`, `[Chorus]`, `[Bridge]` and other bracketed section markers
pub fn strip_section_markers(lyrics: &str) -> String {
    let mut out = String::with_capacity(lyrics.len());
    let mut depth = 0usize;
    for ch in lyrics.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Instrumental request themed on the opening words of the lyrics
pub fn music_request(lyrics: &str, genre: &str, mood: &str, params: &MusicParameters) -> MusicRequest {
    let stripped = strip_section_markers(lyrics);
    let theme: Vec<&str> = stripped.split_whitespace().take(THEME_WORDS).collect();

    let prompt = format!(
        "Beautiful {} instrumental song, {} emotional melody, warm harmonies, gentle rhythm, \
         melodious and uplifting, cinematic quality, inspired by themes of {}, \
         professional studio recording, clear and balanced mix",
        genre,
        mood,
        theme.join(" ")
    );

    MusicRequest {
        prompt,
        negative_prompt: MUSIC_NEGATIVE_PROMPT.to_string(),
        duration_secs: params.requested_seconds(),
        quality: MusicQuality {
            inference_steps: params.inference_steps,
            guidance_scale: params.guidance_scale,
        },
    }
}

/// Short sung excerpt: first three lyric lines, at most 250 characters
pub fn vocal_text(lyrics: &str) -> String {
    let stripped = strip_section_markers(lyrics);
    let lines: Vec<&str> = stripped
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(VOCAL_LINES)
        .collect();
    let excerpt: String = lines.join(" ").chars().take(VOCAL_MAX_CHARS).collect();
    format!("♪ [clears throat] {} ♪", excerpt.trim())
}
