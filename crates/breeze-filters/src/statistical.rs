//! Classifier-backed profanity layer with a sliding word window

use crate::censor::CensorMask;
use crate::classifier::Classifier;
use crate::layer::{CensorOptions, DetectionLayer};
use crate::tokenizer::join_normalized;
use async_trait::async_trait;
use breeze_core::{LayerId, Result, Token};
use std::sync::Arc;
use tracing::debug;

/// Statistical profanity layer.
///
/// Generalizes to misspellings the word lists have never seen, as far as the
/// wrapped classifier does. The classifier's score is turned into a binary
/// verdict with `threshold`.
pub struct StatisticalLayer {
    classifier: Arc<dyn Classifier>,
    threshold: f32,
}

impl StatisticalLayer {
    /// Create a new statistical layer around a classifier
    pub fn new(classifier: Arc<dyn Classifier>, threshold: f32) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }
}

#[async_trait]
impl DetectionLayer for StatisticalLayer {
    fn id(&self) -> LayerId {
        LayerId::Statistical
    }

    async fn is_profane(&self, tokens: &[Token]) -> Result<bool> {
        if !tokens.iter().any(Token::is_word) {
            return Ok(false);
        }
        let result = self.classifier.classify(&join_normalized(tokens)).await?;
        Ok(result.exceeds_threshold(self.threshold))
    }

    async fn mask(&self, tokens: &[Token], options: &CensorOptions) -> Result<CensorMask> {
        let mut mask = CensorMask::new(tokens.len());

        let words: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_word())
            .map(|(i, _)| i)
            .collect();
        if words.is_empty() {
            return Ok(mask);
        }

        let window_size = options.window_size.max(1);
        let windows: Vec<&[usize]> = (0..words.len())
            .map(|start| &words[start..(start + window_size).min(words.len())])
            .collect();

        let texts: Vec<String> = windows
            .iter()
            .map(|window| {
                window
                    .iter()
                    .map(|&i| tokens[i].normalized.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        let results = self.classifier.classify_batch(&texts).await?;

        for (window, result) in windows.iter().zip(&results) {
            if !result.exceeds_threshold(self.threshold) {
                continue;
            }
            debug!(window = ?window, score = result.score, "Statistical window flagged");

            for &i in window.iter() {
                mask.mark(i);
            }
            if let (Some(&first), Some(&last)) = (window.first(), window.last()) {
                mask.mark_before(tokens, first, options.neighbors);
                mask.mark_after(tokens, last, options.neighbors);
            }
        }

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::censor::render;
    use crate::lexicon::LexiconClassifier;
    use crate::tokenizer::Tokenizer;

    fn layer() -> StatisticalLayer {
        StatisticalLayer::new(Arc::new(LexiconClassifier::builtin().unwrap()), 0.5)
    }

    #[tokio::test]
    async fn test_detects_profanity() {
        let tokens = Tokenizer::default().tokenize("this is sh!t");
        assert!(layer().is_profane(&tokens).await.unwrap());
    }

    #[tokio::test]
    async fn test_clean_message() {
        let tokens = Tokenizer::default().tokenize("good game everyone");
        assert!(!layer().is_profane(&tokens).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_separators_are_never_profane() {
        let tokens = Tokenizer::default().tokenize(" ?! ");
        assert!(!layer().is_profane(&tokens).await.unwrap());
    }

    #[tokio::test]
    async fn test_window_with_neighbors() {
        let tokens = Tokenizer::default().tokenize("one two shit three four five");
        let options = CensorOptions {
            replacement: '#',
            neighbors: 1,
            window_size: 1,
        };
        let mask = layer().mask(&tokens, &options).await.unwrap();
        assert_eq!(render(&tokens, &mask, '#'), "one ### #### ##### four five");
    }

    #[tokio::test]
    async fn test_wider_window_covers_more_words() {
        let tokens = Tokenizer::default().tokenize("alpha beta shit gamma");
        let options = CensorOptions {
            replacement: '*',
            neighbors: 0,
            window_size: 2,
        };
        // Windows "beta shit" and "shit gamma" both hit
        let censored = layer().censor(&tokens, &options).await.unwrap();
        assert_eq!(censored, "alpha **** **** *****");
    }
}
