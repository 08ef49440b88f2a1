//! Lossless chat tokenizer with obfuscation-aware normalization
//!
//! Splits a message into word and separator tokens. Words are runs of
//! letters/digits that may carry up to two symbols between characters
//! (`sh!t`, `f**k`, `a.s.s`), so common punctuation tricks stay inside a
//! single token. Every character of the input lands in exactly one token.

use breeze_core::{Result, Token};
use regex::Regex;

/// Regex-driven tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    segment_regex: Regex,
    spaced_out_regex: Regex,
    strip_regex: Regex,
}

impl Tokenizer {
    /// Create a new tokenizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            segment_regex: Regex::new(r"(?P<word>[\p{L}\p{N}](?:[^\w\s]{0,2}[\p{L}\p{N}])*)|\s+|[^\p{L}\p{N}\s]")
                .map_err(|e| breeze_core::Error::internal(format!("Failed to compile segment regex: {}", e)))?,
            spaced_out_regex: Regex::new(r"^(?:[\p{L}\p{N}][^\w\s]+)+[\p{L}\p{N}]$")
                .map_err(|e| breeze_core::Error::internal(format!("Failed to compile spacing regex: {}", e)))?,
            strip_regex: Regex::new(r"[^\p{L}\p{N}]")
                .map_err(|e| breeze_core::Error::internal(format!("Failed to compile strip regex: {}", e)))?,
        })
    }

    /// Split text into tokens. Joining the raw texts gives back `text`.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.segment_regex
            .captures_iter(text)
            .filter_map(|caps| {
                if let Some(word) = caps.name("word") {
                    let raw = word.as_str();
                    return Some(Token::word(raw, self.normalize(raw)));
                }
                caps.get(0).map(|m| Token::separator(m.as_str()))
            })
            .collect()
    }

    /// Normalize a word for matching.
    ///
    /// Letter-separated spellings (`f>u>c>k`, `s-h-i-t`) lose their symbols;
    /// everything else is only lowercased.
    pub fn normalize(&self, word: &str) -> String {
        if self.spaced_out_regex.is_match(word) {
            self.strip_regex.replace_all(word, "").to_lowercase()
        } else {
            word.to_lowercase()
        }
    }

    /// Count word tokens in text
    pub fn count_words(&self, text: &str) -> usize {
        self.tokenize(text).iter().filter(|t| t.is_word()).count()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new().expect("Failed to create tokenizer")
    }
}

/// Join the raw text of tokens back into a string
pub fn join_raw(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Join normalized forms of tokens back into a string
pub fn join_normalized(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.normalized.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use breeze_core::TokenKind;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        assert!(Tokenizer::default().tokenize("").is_empty());
    }

    #[test]
    fn test_normalize_spaced_out() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.normalize("f>u>c>k"), "fuck");
        assert_eq!(tokenizer.normalize("S-H-I-T"), "shit");
        assert_eq!(tokenizer.normalize("a.s.s"), "ass");
    }

    #[test]
    fn test_normalize_plain_word() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.normalize("Hello"), "hello");
        // Symbols are only stripped when every letter is separated
        assert_eq!(tokenizer.normalize("a$$hole"), "a$$hole");
        assert_eq!(tokenizer.normalize("sh!t"), "sh!t");
    }

    #[test]
    fn test_word_and_separator_segments() {
        let tokens = Tokenizer::default().tokenize("you are an a$$hole!");
        let kinds: Vec<_> = tokens.iter().map(|t| (t.text.as_str(), t.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("you", TokenKind::Word),
                (" ", TokenKind::Separator),
                ("are", TokenKind::Word),
                (" ", TokenKind::Separator),
                ("an", TokenKind::Word),
                (" ", TokenKind::Separator),
                ("a$$hole", TokenKind::Word),
                ("!", TokenKind::Separator),
            ]
        );
    }

    #[test]
    fn test_spaced_out_word_is_one_token() {
        let tokens = Tokenizer::default().tokenize("what the f.u.c.k");
        let last = tokens.last().unwrap();
        assert_eq!(last.text, "f.u.c.k");
        assert_eq!(last.normalized, "fuck");
    }

    #[test]
    fn test_more_than_two_symbols_split_the_word() {
        let tokens = Tokenizer::default().tokenize("a...b");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[4].text, "b");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(Tokenizer::default().count_words("hi, there  friend!"), 3);
    }

    proptest! {
        #[test]
        fn prop_tokenize_is_lossless(text in "\\PC{0,64}") {
            let tokenizer = Tokenizer::default();
            prop_assert_eq!(join_raw(&tokenizer.tokenize(&text)), text);
        }

        #[test]
        fn prop_tokenize_is_lossless_with_symbols(text in "[a-zA-Z0-9 .,!?$@*>_\\-]{0,48}") {
            let tokenizer = Tokenizer::default();
            prop_assert_eq!(join_raw(&tokenizer.tokenize(&text)), text);
        }
    }
}
