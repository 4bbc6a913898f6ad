//! Sentence segmentation for incremental speech synthesis.
//!
//! The streaming coordinator accumulates model tokens into a buffer and
//! needs to know, at every step, which prefix of that buffer is safe to
//! hand to the synthesis engine. [`split_sentences`] answers that: it
//! returns the complete sentences in order plus the unconsumed remainder
//! the caller must keep for the next call.
//!
//! Re-running the function on its own remainder plus newly appended text
//! produces the same boundaries as running it once over the concatenation,
//! so the caller never has to re-synthesize or re-scan consumed text.

use regex::Regex;
use std::sync::LazyLock;

/// Abbreviations whose trailing period is not a sentence boundary.
/// Fixed and case-insensitive; not configurable or locale-aware.
const ABBREVIATION_PATTERN: &str =
    r"(?i)\b(Mr|Mrs|Ms|Dr|Prof|Sr|Jr|vs|etc|i\.e|e\.g|Inc|Ltd|Corp|Co)\.";

/// Sentinel standing in for a protected abbreviation period. U+0001 cannot
/// occur in model output, so the substitution is unambiguous.
const PROTECTED_PERIOD: char = '\u{1}';

static ABBREVIATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ABBREVIATION_PATTERN).expect("abbreviation pattern is valid")
});

/// A sentence ends in `.`, `!`, or `?`, optionally followed by closing
/// quotes or brackets, then whitespace or end of input.
static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["'”’)\]]*(\s+|$)"#).expect("boundary pattern is valid")
});

fn restore(text: &str) -> String {
    text.replace(PROTECTED_PERIOD, ".")
}

/// Splits accumulated text into complete sentences plus a trailing
/// remainder.
///
/// The remainder is the possibly-unfinished tail the caller should retain
/// and prepend to the next batch of text. Text with no terminal
/// punctuation yields zero sentences and the whole input as remainder.
pub fn split_sentences(text: &str) -> (Vec<String>, String) {
    let protected = ABBREVIATION_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("{}{}", &caps[1], PROTECTED_PERIOD)
        });

    let mut sentences = Vec::new();
    let mut consumed = 0;
    for boundary in BOUNDARY_RE.find_iter(&protected) {
        let sentence = protected[consumed..boundary.end()].trim();
        if !sentence.is_empty() {
            sentences.push(restore(sentence));
        }
        consumed = boundary.end();
    }

    let remainder = restore(protected[consumed..].trim_start());
    (sentences, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_terminal_punctuation_is_all_remainder() {
        let (sentences, remainder) = split_sentences("The quick brown fox");
        assert!(sentences.is_empty());
        assert_eq!(remainder, "The quick brown fox");
    }

    #[test]
    fn abbreviations_do_not_split() {
        let (sentences, remainder) = split_sentences("Dr. Smith arrived. He left.");
        assert_eq!(sentences, vec!["Dr. Smith arrived.", "He left."]);
        assert_eq!(remainder, "");
    }

    #[test]
    fn abbreviations_match_case_insensitively() {
        let (sentences, _) = split_sentences("See the DR. Jones case. Next point here.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "See the DR. Jones case.");
    }

    #[test]
    fn exclamation_and_question_marks_split() {
        let (sentences, remainder) = split_sentences("Stop! Really? Fine then");
        assert_eq!(sentences, vec!["Stop!", "Really?"]);
        assert_eq!(remainder, "Fine then");
    }

    #[test]
    fn closing_quotes_stay_attached() {
        let (sentences, remainder) = split_sentences("He said \"go home.\" Then silence fell");
        assert_eq!(sentences, vec!["He said \"go home.\""]);
        assert_eq!(remainder, "Then silence fell");
    }

    #[test]
    fn ellipsis_is_one_boundary() {
        let (sentences, remainder) = split_sentences("Wait... it moved");
        assert_eq!(sentences, vec!["Wait..."]);
        assert_eq!(remainder, "it moved");
    }

    #[test]
    fn trailing_abbreviation_stays_in_remainder() {
        let (sentences, remainder) = split_sentences("The report cites Dr.");
        assert!(sentences.is_empty());
        assert_eq!(remainder, "The report cites Dr.");
    }

    #[test]
    fn chunked_accumulation_matches_one_shot() {
        let full = "Dr. Smith arrived. He left quickly. The end";

        // One shot.
        let (one_shot, one_shot_rem) = split_sentences(full);

        // Chunked at an awkward point, carrying the remainder.
        let (first, rem) = split_sentences("Dr. Smith arrived. He le");
        let mut carried = rem;
        carried.push_str("ft quickly. The end");
        let (second, second_rem) = split_sentences(&carried);

        let mut combined = first;
        combined.extend(second);
        assert_eq!(combined, one_shot);
        assert_eq!(second_rem, one_shot_rem);
    }

    #[test]
    fn empty_input() {
        let (sentences, remainder) = split_sentences("");
        assert!(sentences.is_empty());
        assert_eq!(remainder, "");
    }

    #[test]
    fn whitespace_only_input() {
        let (sentences, remainder) = split_sentences("   ");
        assert!(sentences.is_empty());
        assert_eq!(remainder, "");
    }

    #[test]
    fn sentence_at_end_of_input_is_complete() {
        let (sentences, remainder) = split_sentences("It works.");
        assert_eq!(sentences, vec!["It works."]);
        assert_eq!(remainder, "");
    }
}
