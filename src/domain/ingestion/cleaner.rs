//! Text normalisation applied before chunking

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F\u{200B}]")
        .expect("control char pattern is valid")
});

/// Clean and standardise extracted document text.
///
/// Collapses whitespace runs to a single space, strips control characters
/// and zero-width spaces, and straightens typographic quotes.
pub fn clean_text(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    let stripped = CONTROL_CHARS.replace_all(&collapsed, "");

    stripped
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean_text("a  b\n\n\nc\t d"), "a b c d");
    }

    #[test]
    fn test_strips_control_and_zero_width() {
        assert_eq!(clean_text("ab\u{0007}c\u{200B}d"), "abcd");
    }

    #[test]
    fn test_normalises_quotes() {
        assert_eq!(
            clean_text("\u{201C}Décision\u{201D} l\u{2019}arrêté"),
            "\"Décision\" l'arrêté"
        );
    }

    #[test]
    fn test_trims_and_handles_empty() {
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("  x  "), "x");
    }
}
