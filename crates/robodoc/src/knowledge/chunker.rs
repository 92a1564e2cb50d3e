//! Paragraph chunking for the tariff schedule

use regex::Regex;
use std::sync::OnceLock;

/// A blank line: a newline followed by whitespace-only content up to the next newline
fn blank_line() -> &'static Regex {
    static BLANK_LINE: OnceLock<Regex> = OnceLock::new();
    BLANK_LINE.get_or_init(|| Regex::new(r"\n[ \t\r\f\v]*\n").expect("valid blank-line regex"))
}

/// Split text into paragraph-scale chunks
///
/// Paragraphs are separated by one or more blank lines. Chunks are trimmed
/// and empty ones discarded; order follows the source text.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    blank_line()
        .split(&normalized)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}
