//! Breeze Core
//!
//! Core types and utilities shared across the Breeze moderation crates.
//!
//! This crate provides:
//! - Token types produced by the tokenizer and consumed by every detection layer
//! - Detection layer identifiers and per-layer verdicts
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{DetectionVerdict, LayerId, Token, TokenKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{DetectionVerdict, LayerId, Token, TokenKind};
}
