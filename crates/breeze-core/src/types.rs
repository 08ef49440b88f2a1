//! Core types for Breeze

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a token carries word content or only separates words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Letters and digits, possibly with a few embedded symbols (`sh!t`, `f>u>c>k`)
    Word,
    /// Whitespace runs and standalone punctuation
    Separator,
}

/// A single segment of a chat message.
///
/// Tokens keep the raw text exactly as typed so that a token sequence can be
/// joined back into the original message. Detection works on `normalized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Raw text as it appeared in the message
    pub text: String,

    /// Word or separator
    pub kind: TokenKind,

    /// Lowercased, de-obfuscated form used for matching
    pub normalized: String,
}

impl Token {
    /// Create a word token with an already computed normalized form
    pub fn word(text: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Word,
            normalized: normalized.into(),
        }
    }

    /// Create a separator token; separators normalize to themselves
    pub fn separator(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            normalized: text.clone(),
            text,
            kind: TokenKind::Separator,
        }
    }

    /// Check if this is a word token
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    /// Width of the raw text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Identifier of a detection layer, also used as the key of the toggle map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerId {
    /// Whole-message toxicity scoring (optional, needs a toxicity model)
    Toxicity,
    /// Classifier-backed profanity check with a sliding window
    Statistical,
    /// Small fuzzy-matched blacklist
    Extralist,
    /// Large substring wordlist
    Longlist,
}

impl LayerId {
    /// All layers in evaluation order
    pub const ALL: [LayerId; 4] = [
        LayerId::Toxicity,
        LayerId::Statistical,
        LayerId::Extralist,
        LayerId::Longlist,
    ];

    /// Stable name used in config files, logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toxicity => "toxicity",
            Self::Statistical => "statistical",
            Self::Extralist => "extralist",
            Self::Longlist => "longlist",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict of one layer for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    /// Layer that produced the verdict
    pub layer: LayerId,

    /// Whether the layer considers the message profane
    pub caught: bool,
}

impl DetectionVerdict {
    /// Create a new verdict
    pub fn new(layer: LayerId, caught: bool) -> Self {
        Self { layer, caught }
    }

    /// A layer that failed or timed out does not vote
    pub fn abstain(layer: LayerId) -> Self {
        Self::new(layer, false)
    }
}
