//! Post-filter for speech-to-text output.
//!
//! The transcription engine has a known failure mode on silence or noise:
//! it emits a short phrase repeated over and over, or hallucinates text
//! that mixes unrelated scripts. Neither should ever reach the model, so
//! garbled transcripts are discarded and treated as "no speech detected".

use regex::Regex;
use std::sync::LazyLock;

/// Minimum length (in chars) of a repeated phrase worth flagging.
const MIN_PHRASE_LEN: usize = 5;

/// Number of consecutive occurrences that marks a transcript as garbled.
const REPEAT_THRESHOLD: usize = 3;

/// One matcher per script family; a transcript touching more than one
/// family is considered garbled.
static SCRIPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[a-zA-Z]",             // Latin
        r"[\u{0600}-\u{06FF}]",  // Arabic
        r"[\u{0400}-\u{04FF}]",  // Cyrillic
        r"[\u{4E00}-\u{9FFF}]",  // CJK unified ideographs
    ]
    .iter()
    .map(|p| Regex::new(p).expect("script pattern is valid"))
    .collect()
});

/// Returns `true` if the transcript is evidently garbled: a near-verbatim
/// consecutive repetition or a mix of scripts.
pub fn is_garbled(text: &str) -> bool {
    has_repeated_phrase(text) || has_mixed_scripts(text)
}

/// Detects a substring of length >= [`MIN_PHRASE_LEN`] repeated
/// [`REPEAT_THRESHOLD`] or more times consecutively, with optional
/// whitespace between occurrences.
///
/// The equivalent backreference pattern (`(.{5,})(\s*\1){2,}`) is not
/// expressible in the `regex` crate, so the scan is done directly over
/// char windows.
fn has_repeated_phrase(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    if n < MIN_PHRASE_LEN * REPEAT_THRESHOLD {
        return false;
    }

    for start in 0..n {
        // A phrase must fit REPEAT_THRESHOLD times in what's left (the
        // optional whitespace between occurrences only adds length).
        let max_len = (n - start) / REPEAT_THRESHOLD;
        for len in MIN_PHRASE_LEN..=max_len {
            let candidate = &chars[start..start + len];
            let mut count = 1;
            let mut pos = start + len;

            while count < REPEAT_THRESHOLD {
                let mut next = pos;
                while next < n && chars[next].is_whitespace() {
                    next += 1;
                }
                if next + len <= n && &chars[next..next + len] == candidate {
                    count += 1;
                    pos = next + len;
                } else {
                    break;
                }
            }

            if count >= REPEAT_THRESHOLD {
                return true;
            }
        }
    }

    false
}

/// Detects characters from more than one script family.
fn has_mixed_scripts(text: &str) -> bool {
    SCRIPT_PATTERNS
        .iter()
        .filter(|re| re.is_match(text))
        .count()
        > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_word_is_garbled() {
        assert!(is_garbled("help help help help help"));
    }

    #[test]
    fn three_repeats_suffice() {
        assert!(is_garbled("thank you. thank you. thank you."));
    }

    #[test]
    fn two_repeats_are_fine() {
        assert!(!is_garbled("hello hello"));
    }

    #[test]
    fn short_repeats_are_fine() {
        // "ha" is below the minimum phrase length even with whitespace.
        assert!(!is_garbled("ha ha ha"));
    }

    #[test]
    fn normal_text_is_clean() {
        assert!(!is_garbled("The quick brown fox"));
        assert!(!is_garbled(
            "I would like to know more about the history of Rome."
        ));
    }

    #[test]
    fn mixed_latin_cyrillic_is_garbled() {
        assert!(is_garbled("hello мир"));
    }

    #[test]
    fn mixed_latin_cjk_is_garbled() {
        assert!(is_garbled("hello 世界"));
    }

    #[test]
    fn single_script_non_latin_is_clean() {
        assert!(!is_garbled("Привет, как дела"));
    }

    #[test]
    fn empty_is_clean() {
        assert!(!is_garbled(""));
    }
}
