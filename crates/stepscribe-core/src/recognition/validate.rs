//! Heuristics that reject OCR noise on small UI glyphs.

use serde::{Deserialize, Serialize};

const MAX_TEXT_LEN: usize = 100;
const MAX_NON_LETTER_RUN: usize = 3;
const MIN_ALPHA_RATIO: f64 = 0.2;
const NO_VOWEL_MIN_LEN: usize = 6;

/// Single characters that carry meaning on their own in a UI.
pub const MEANINGFUL_SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '=', '<', '>', '|', '\\', '&', '@', '#', 'X', 'O', '?', '!', '%', '$',
    '^', '~', '_', '`', ':', 'x',
];

/// Substrings that rarely occur in real labels.
const GIBBERISH_PATTERNS: &[&str] = &["ij", "jj", "qq", "xx", "zz", "|||", "...", "---", "___"];

/// Why a recognition result was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Empty,
    LowConfidence,
    TooShort,
    TooLong,
    NoAlphanumeric,
    NonLetterRun,
    LowAlphaRatio,
    GibberishPattern,
    NoVowels,
}

pub fn is_meaningful_single_char(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => ch.is_alphanumeric() || MEANINGFUL_SYMBOLS.contains(&ch),
        _ => false,
    }
}

pub fn validate(text: &str, confidence: f32, min_confidence: f32) -> Result<(), Rejection> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::Empty);
    }
    if confidence < min_confidence {
        return Err(Rejection::LowConfidence);
    }

    let len = text.chars().count();
    if len == 1 {
        return if is_meaningful_single_char(text) {
            Ok(())
        } else {
            Err(Rejection::TooShort)
        };
    }
    if len > MAX_TEXT_LEN {
        return Err(Rejection::TooLong);
    }
    if !text.chars().any(char::is_alphanumeric) {
        return Err(Rejection::NoAlphanumeric);
    }
    if longest_non_letter_run(text) > MAX_NON_LETTER_RUN {
        return Err(Rejection::NonLetterRun);
    }

    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if (letters as f64 / len as f64) < MIN_ALPHA_RATIO {
        return Err(Rejection::LowAlphaRatio);
    }

    let lower = text.to_lowercase();
    if GIBBERISH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(Rejection::GibberishPattern);
    }

    if len > NO_VOWEL_MIN_LEN && letters > 4 && !lower.chars().any(|c| "aeiou".contains(c)) {
        return Err(Rejection::NoVowels);
    }

    Ok(())
}

fn longest_non_letter_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_character_rules() {
        assert_eq!(validate("·", 0.2, 0.3), Err(Rejection::LowConfidence));
        assert_eq!(validate("·", 0.9, 0.3), Err(Rejection::TooShort));
        assert_eq!(validate("+", 0.9, 0.3), Ok(()));
        assert_eq!(validate("X", 0.9, 0.3), Ok(()));
        assert_eq!(validate("7", 0.9, 0.3), Ok(()));
    }

    #[test]
    fn test_accepts_ordinary_labels() {
        for label in ["Submit", "Save As", "OK", "File > Open", "Sign in", "Page 2"] {
            assert_eq!(validate(label, 0.9, 0.3), Ok(()), "{label}");
        }
    }

    #[test]
    fn test_rejects_noise() {
        assert_eq!(validate("   ", 0.9, 0.3), Err(Rejection::Empty));
        assert_eq!(validate(&"a".repeat(101), 0.9, 0.3), Err(Rejection::TooLong));
        assert_eq!(validate("|#~", 0.9, 0.3), Err(Rejection::NoAlphanumeric));
        assert_eq!(validate("ab 1234", 0.9, 0.3), Err(Rejection::NonLetterRun));
        assert_eq!(validate("a1b2c3d4e5", 0.9, 0.3), Ok(()));
        assert_eq!(validate("Hello...", 0.9, 0.3), Err(Rejection::GibberishPattern));
        assert_eq!(validate("bcdfghjk", 0.9, 0.3), Err(Rejection::NoVowels));
    }

    #[test]
    fn test_alpha_ratio() {
        // 1 letter in 6 characters, no run longer than 3.
        assert_eq!(validate("1.2a3.", 0.9, 0.3), Err(Rejection::LowAlphaRatio));
    }
}
