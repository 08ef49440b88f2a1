//! Classifier capability and common types
//!
//! A classifier is the black-box scoring service behind the statistical and
//! toxicity layers. It may be a local lexicon, an ONNX model or a remote API;
//! the layers only see scores.

use async_trait::async_trait;
use breeze_core::Result;

/// Trait for all classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Classify several texts, returning results in the same order.
    ///
    /// The default calls `classify` sequentially; backends that support
    /// batching should override it.
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<ClassificationResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await?);
        }
        Ok(results)
    }

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Classification label
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub score: f32,

    /// Additional metadata
    pub metadata: ClassificationMetadata,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            metadata: ClassificationMetadata::default(),
            latency_us: 0,
        }
    }

    /// Attach per-category scores
    pub fn with_categories(mut self, scores: Vec<(String, f32)>) -> Self {
        self.metadata.all_scores = Some(scores);
        self
    }

    /// Check if score exceeds threshold
    pub fn exceeds_threshold(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// Per-category scores, falling back to the single label/score pair
    pub fn category_scores(&self) -> Vec<(String, f32)> {
        match &self.metadata.all_scores {
            Some(scores) if !scores.is_empty() => scores.clone(),
            _ => vec![(self.label.clone(), self.score)],
        }
    }

    /// Check if any category reaches the threshold
    pub fn any_category_exceeds(&self, threshold: f32) -> bool {
        self.category_scores()
            .iter()
            .any(|(_, score)| *score >= threshold)
    }
}

/// Metadata about classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetadata {
    /// Matched spans (for pattern-based classifiers)
    pub spans: Vec<(usize, usize)>,

    /// Model name or version
    pub model: Option<String>,

    /// All category scores (for multi-label classifiers)
    pub all_scores: Option<Vec<(String, f32)>>,
}
