//! Detection layer trait and shared options

use crate::censor::{render, CensorMask, DEFAULT_REPLACEMENT};
use async_trait::async_trait;
use breeze_core::{LayerId, Result, Token};

/// Options a layer uses when building its mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CensorOptions {
    /// Character written over masked words
    pub replacement: char,

    /// Word tokens to mask on each side of a hit
    pub neighbors: usize,

    /// Word tokens per classifier window (statistical layer only)
    pub window_size: usize,
}

impl Default for CensorOptions {
    fn default() -> Self {
        Self {
            replacement: DEFAULT_REPLACEMENT,
            neighbors: 1,
            window_size: 1,
        }
    }
}

/// One independent profanity detector.
///
/// Layers are pure with respect to their input and may be evaluated in
/// parallel. A layer that errors is treated as abstaining by the service.
#[async_trait]
pub trait DetectionLayer: Send + Sync {
    /// Identifier used for toggles, logs and the caught list
    fn id(&self) -> LayerId;

    /// Decide whether the tokenized message is profane
    async fn is_profane(&self, tokens: &[Token]) -> Result<bool>;

    /// Build this layer's mask for the tokenized message
    async fn mask(&self, tokens: &[Token], options: &CensorOptions) -> Result<CensorMask>;

    /// Render the tokens with this layer's mask applied
    async fn censor(&self, tokens: &[Token], options: &CensorOptions) -> Result<String> {
        let mask = self.mask(tokens, options).await?;
        Ok(render(tokens, &mask, options.replacement))
    }
}
