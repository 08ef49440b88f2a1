//! Fuzzy blacklist layer
//!
//! Catches near-miss spellings (`shlt`, `a$$hole`) by edit distance against a
//! small curated blacklist. Very sensitive; the allow-list exists to keep
//! ordinary words from tripping it.

use crate::censor::CensorMask;
use crate::distance::levenshtein_chars;
use crate::layer::{CensorOptions, DetectionLayer};
use crate::wordlists::WordList;
use async_trait::async_trait;
use breeze_core::{LayerId, Result, Token};
use std::collections::HashSet;

/// Maximum length difference for the substring rule
const SUBSTRING_LENGTH_SLACK: usize = 5;

/// Fuzzy extralist layer
pub struct ExtralistLayer {
    blacklist: Vec<Vec<char>>,
    allowlist: HashSet<String>,
}

impl ExtralistLayer {
    /// Create a new layer from a blacklist and an allow-list
    pub fn new(blacklist: &WordList, allowlist: &WordList) -> Self {
        Self {
            blacklist: blacklist.iter().map(|w| w.chars().collect()).collect(),
            allowlist: allowlist.iter().map(str::to_string).collect(),
        }
    }

    /// Create a layer over the built-in lists
    pub fn builtin() -> Self {
        Self::new(
            &WordList::builtin_extralist(),
            &WordList::builtin_allowlist(),
        )
    }

    /// Check a single normalized word against the blacklist
    pub fn word_matches(&self, word: &str) -> bool {
        if self.allowlist.contains(word) {
            return false;
        }

        let chars: Vec<char> = word.chars().collect();
        self.blacklist.iter().any(|bad| {
            if bad.is_empty() {
                return false;
            }

            // Rule 1: fuzzy match on the whole word
            if levenshtein_chars(&chars, bad) <= whole_word_tolerance(bad.len()) {
                return true;
            }

            // Rule 2: fuzzy match on any same-length slice when lengths are close
            chars.len().abs_diff(bad.len()) <= SUBSTRING_LENGTH_SLACK
                && chars
                    .windows(bad.len())
                    .any(|chunk| levenshtein_chars(chunk, bad) <= substring_tolerance(bad.len()))
        })
    }
}

/// `max(1, floor(len / 1.3))`
fn whole_word_tolerance(len: usize) -> usize {
    (len * 10 / 13).max(1)
}

/// `max(1, floor(len / 2))`
fn substring_tolerance(len: usize) -> usize {
    (len / 2).max(1)
}

#[async_trait]
impl DetectionLayer for ExtralistLayer {
    fn id(&self) -> LayerId {
        LayerId::Extralist
    }

    async fn is_profane(&self, tokens: &[Token]) -> Result<bool> {
        Ok(tokens
            .iter()
            .filter(|t| t.is_word())
            .any(|t| self.word_matches(&t.normalized)))
    }

    async fn mask(&self, tokens: &[Token], options: &CensorOptions) -> Result<CensorMask> {
        let mut mask = CensorMask::new(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if token.is_word() && self.word_matches(&token.normalized) {
                mask.mark(i);
                mask.mark_neighbors(tokens, i, options.neighbors);
            }
        }
        Ok(mask)
    }
}
