//! Whole-message toxicity layer
//!
//! Wraps a category-scoring model (toxicity, insult, threat, ...). A hit
//! obscures every word of the message.

use crate::censor::CensorMask;
use crate::classifier::Classifier;
use crate::layer::{CensorOptions, DetectionLayer};
use crate::tokenizer::join_raw;
use async_trait::async_trait;
use breeze_core::{LayerId, Result, Token};
use std::sync::Arc;

/// Toxicity detection layer
pub struct ToxicityLayer {
    classifier: Arc<dyn Classifier>,
    threshold: f32,
}

impl ToxicityLayer {
    /// Create a new toxicity layer; any category at or above `threshold` flags
    pub fn new(classifier: Arc<dyn Classifier>, threshold: f32) -> Self {
        Self {
            classifier,
            threshold,
        }
    }
}

#[async_trait]
impl DetectionLayer for ToxicityLayer {
    fn id(&self) -> LayerId {
        LayerId::Toxicity
    }

    async fn is_profane(&self, tokens: &[Token]) -> Result<bool> {
        if tokens.is_empty() {
            return Ok(false);
        }
        let result = self.classifier.classify(&join_raw(tokens)).await?;
        Ok(result.any_category_exceeds(self.threshold))
    }

    async fn mask(&self, tokens: &[Token], _options: &CensorOptions) -> Result<CensorMask> {
        Ok(CensorMask::all_words(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationResult;
    use crate::tokenizer::Tokenizer;

    struct FixedScores(Vec<(String, f32)>);

    #[async_trait]
    impl Classifier for FixedScores {
        async fn classify(&self, _text: &str) -> Result<ClassificationResult> {
            Ok(ClassificationResult::new("toxicity", 0.0).with_categories(self.0.clone()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_any_category_over_threshold_flags() {
        let layer = ToxicityLayer::new(
            Arc::new(FixedScores(vec![
                ("toxicity".to_string(), 0.2),
                ("threat".to_string(), 0.8),
            ])),
            0.54,
        );
        let tokens = Tokenizer::default().tokenize("i will find you");
        assert!(layer.is_profane(&tokens).await.unwrap());

        let censored = layer.censor(&tokens, &CensorOptions::default()).await.unwrap();
        assert_eq!(censored, "# #### #### ###");
    }

    #[tokio::test]
    async fn test_low_scores_pass() {
        let layer = ToxicityLayer::new(
            Arc::new(FixedScores(vec![("toxicity".to_string(), 0.539)])),
            0.54,
        );
        let tokens = Tokenizer::default().tokenize("nice build");
        assert!(!layer.is_profane(&tokens).await.unwrap());
    }
}
