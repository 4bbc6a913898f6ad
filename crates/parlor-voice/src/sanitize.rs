//! Text cleanup before speech synthesis.
//!
//! Model output is markdown; reading `**bold**` or a rocket emoji aloud is
//! worse than silence. [`clean_for_speech`] strips markdown punctuation
//! markers and emoji code-point ranges from a sentence before it reaches
//! the synthesis engine.
//!
//! The function is total: if the compiled pattern set is ever unavailable,
//! it falls back to a plain code-point filter instead of failing.

use regex::Regex;
use std::sync::LazyLock;

/// Markdown punctuation the synthesis engine must not vocalize.
static MARKDOWN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[*_~`#\[\]()<>]").ok());

/// Emoji and pictograph code-point ranges.
static EMOJI_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F600}-\u{1F64F}", // emoticons
        "\u{1F300}-\u{1F5FF}", // symbols & pictographs
        "\u{1F680}-\u{1F6FF}", // transport & map symbols
        "\u{1F1E0}-\u{1F1FF}", // regional indicators (flags)
        "\u{2702}-\u{27B0}",   // dingbats
        "\u{24C2}-\u{1F251}",
        "]+",
    ))
    .ok()
});

const MARKDOWN_CHARS: &[char] = &['*', '_', '~', '`', '#', '[', ']', '(', ')', '<', '>'];

fn is_emoji_fallback(c: char) -> bool {
    matches!(u32::from(c),
        0x1F600..=0x1F64F
        | 0x1F300..=0x1F5FF
        | 0x1F680..=0x1F6FF
        | 0x1F1E0..=0x1F1FF
        | 0x2702..=0x27B0
        | 0x24C2..=0x1F251)
}

/// Strips markdown markers and emoji from a sentence, returning the
/// trimmed result. Never fails.
pub fn clean_for_speech(text: &str) -> String {
    let without_markdown = match MARKDOWN_RE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.chars().filter(|c| !MARKDOWN_CHARS.contains(c)).collect(),
    };

    let cleaned = match EMOJI_RE.as_ref() {
        Some(re) => re.replace_all(&without_markdown, "").into_owned(),
        None => without_markdown
            .chars()
            .filter(|c| !is_emoji_fallback(*c))
            .collect(),
    };

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_markers() {
        assert_eq!(
            clean_for_speech("**Bold** and _italic_ and `code`"),
            "Bold and italic and code"
        );
    }

    #[test]
    fn strips_headings_and_links() {
        assert_eq!(
            clean_for_speech("# Title [link](url)"),
            "Title linkurl"
        );
    }

    #[test]
    fn strips_emoji() {
        assert_eq!(clean_for_speech("Launch \u{1F680} now"), "Launch  now");
        assert_eq!(clean_for_speech("\u{1F600}\u{1F601}"), "");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            clean_for_speech("The quick brown fox."),
            "The quick brown fox."
        );
    }

    #[test]
    fn result_is_trimmed() {
        assert_eq!(clean_for_speech("  hello  "), "hello");
    }

    #[test]
    fn fallback_filter_matches_primary() {
        let input = "**Go** \u{1F680} [now](x)";
        let primary = clean_for_speech(input);

        let fallback: String = input
            .chars()
            .filter(|c| !MARKDOWN_CHARS.contains(c) && !is_emoji_fallback(*c))
            .collect();
        assert_eq!(primary, fallback.trim());
    }
}
