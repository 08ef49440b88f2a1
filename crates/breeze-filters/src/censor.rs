//! Censor masks and rendering
//!
//! A mask is a per-token flag vector. Layers build masks, the service
//! OR-combines them and renders the result onto the original tokens.

use breeze_core::Token;
use serde::{Deserialize, Serialize};

/// Default replacement character
pub const DEFAULT_REPLACEMENT: char = '#';

/// Boolean mask aligned 1:1 with a token sequence
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CensorMask {
    flags: Vec<bool>,
}

impl CensorMask {
    /// An all-false mask for `len` tokens
    pub fn new(len: usize) -> Self {
        Self {
            flags: vec![false; len],
        }
    }

    /// Build a mask from explicit flags
    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    /// Mark every word token
    pub fn all_words(tokens: &[Token]) -> Self {
        Self {
            flags: tokens.iter().map(Token::is_word).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// True when no token is marked
    pub fn is_clear(&self) -> bool {
        !self.flags.iter().any(|f| *f)
    }

    pub fn marked_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// Mark a single token; out-of-range indices are ignored
    pub fn mark(&mut self, index: usize) {
        if let Some(flag) = self.flags.get_mut(index) {
            *flag = true;
        }
    }

    /// Mark up to `neighbors` word tokens on each side of `index`.
    ///
    /// Separators are skipped and do not count toward the budget.
    pub fn mark_neighbors(&mut self, tokens: &[Token], index: usize, neighbors: usize) {
        self.mark_before(tokens, index, neighbors);
        self.mark_after(tokens, index, neighbors);
    }

    /// Mark up to `count` word tokens to the left of `index`
    pub fn mark_before(&mut self, tokens: &[Token], index: usize, count: usize) {
        let mut seen = 0;
        let mut j = index.min(tokens.len());
        while j > 0 && seen < count {
            j -= 1;
            if tokens[j].is_word() {
                self.mark(j);
                seen += 1;
            }
        }
    }

    /// Mark up to `count` word tokens to the right of `index`
    pub fn mark_after(&mut self, tokens: &[Token], index: usize, count: usize) {
        let mut seen = 0;
        let mut j = index;
        while j + 1 < tokens.len() && seen < count {
            j += 1;
            if tokens[j].is_word() {
                self.mark(j);
                seen += 1;
            }
        }
    }

    /// OR another mask into this one. A shorter mask only affects its prefix.
    pub fn merge(&mut self, other: &CensorMask) {
        if self.flags.len() < other.flags.len() {
            self.flags.resize(other.flags.len(), false);
        }
        for (flag, other) in self.flags.iter_mut().zip(&other.flags) {
            *flag |= *other;
        }
    }
}

/// Render tokens with masked words replaced by equal-width runs of `replacement`.
///
/// Separators always pass through, even when marked.
pub fn render(tokens: &[Token], mask: &CensorMask, replacement: char) -> String {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.text.len()).sum());
    for (i, token) in tokens.iter().enumerate() {
        if token.is_word() && mask.is_marked(i) {
            out.extend(std::iter::repeat(replacement).take(token.char_len()));
        } else {
            out.push_str(&token.text);
        }
    }
    out
}
