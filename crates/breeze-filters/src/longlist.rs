//! Substring wordlist layer

use crate::censor::CensorMask;
use crate::layer::{CensorOptions, DetectionLayer};
use crate::wordlists::WordList;
use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;
use breeze_core::{LayerId, Result, Token};

/// Large substring blacklist. A word containing any entry is flagged.
pub struct LonglistLayer {
    matcher: AhoCorasick,
    entries: Vec<String>,
}

impl LonglistLayer {
    /// Create a new longlist layer
    pub fn new(entries: &WordList) -> Result<Self> {
        let entries: Vec<String> = entries.iter().map(str::to_string).collect();

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&entries)
            .map_err(|e| breeze_core::Error::layer(format!("Failed to build longlist matcher: {}", e)))?;

        Ok(Self { matcher, entries })
    }

    /// Create a layer over the built-in longlist
    pub fn builtin() -> Result<Self> {
        Self::new(&WordList::builtin_longlist())
    }

    /// First longlist entry found in a normalized word
    pub fn first_match(&self, word: &str) -> Option<&str> {
        self.matcher
            .find(word)
            .map(|m| self.entries[m.pattern().as_usize()].as_str())
    }
}

#[async_trait]
impl DetectionLayer for LonglistLayer {
    fn id(&self) -> LayerId {
        LayerId::Longlist
    }

    async fn is_profane(&self, tokens: &[Token]) -> Result<bool> {
        Ok(tokens
            .iter()
            .filter(|t| t.is_word())
            .any(|t| self.first_match(&t.normalized).is_some()))
    }

    /// The hit consumes one slot of the neighbor budget, so only
    /// `neighbors - 1` words on each side are masked with it.
    async fn mask(&self, tokens: &[Token], options: &CensorOptions) -> Result<CensorMask> {
        let mut mask = CensorMask::new(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if !token.is_word() || self.first_match(&token.normalized).is_none() {
                continue;
            }
            mask.mark(i);
            mask.mark_neighbors(tokens, i, options.neighbors.saturating_sub(1));
        }
        Ok(mask)
    }
}
