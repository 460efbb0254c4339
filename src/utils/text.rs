//! Text processing utilities.

use std::sync::OnceLock;

use regex::Regex;

/// Check if text is blank (empty or whitespace-only).
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Collapse runs of whitespace left over from markup stripping.
///
/// Blank lines are preserved as paragraph separators; spaces and tabs
/// inside a line are squashed to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    static INLINE_WS: OnceLock<Regex> = OnceLock::new();
    static MANY_NEWLINES: OnceLock<Regex> = OnceLock::new();

    let inline = INLINE_WS.get_or_init(|| Regex::new(r"[ \t\r]+").expect("valid regex"));
    let newlines = MANY_NEWLINES.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let squashed = inline.replace_all(text, " ");
    let collapsed = newlines.replace_all(&squashed, "\n\n");

    collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Estimate the number of tokens in a text.
/// Uses a simple heuristic: ~4 characters per token on average.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("   \n\t  "));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn whitespace_normalization() {
        let input = "Title   here\t\n\n\n\n\nBody  text. ";
        assert_eq!(normalize_whitespace(input), "Title here\n\nBody text.");
    }

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens("1234"), 1);
        assert_eq!(estimate_tokens("12345678"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}
