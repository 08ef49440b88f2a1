//! Lexicon-backed profanity classifier
//!
//! The default backend for the statistical layer when no model is wired in.
//! Text is folded (lowercase, common leetspeak substitutions, symbols
//! dropped) and scanned with Aho-Corasick for profanity roots.

use crate::classifier::{ClassificationMetadata, ClassificationResult, Classifier};
use crate::wordlists::WordList;
use aho_corasick::AhoCorasick;
use breeze_core::Result;
use std::time::Instant;

/// Fast lexicon classifier using the Aho-Corasick algorithm
pub struct LexiconClassifier {
    name: String,
    matcher: AhoCorasick,
    roots: Vec<String>,
}

impl LexiconClassifier {
    /// Create a classifier over the given roots
    pub fn new(name: impl Into<String>, roots: &WordList) -> Result<Self> {
        let roots: Vec<String> = roots.iter().map(fold).filter(|r| !r.is_empty()).collect();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&roots)
            .map_err(|e| breeze_core::Error::classifier(format!("Failed to build lexicon matcher: {}", e)))?;

        Ok(Self {
            name: name.into(),
            matcher,
            roots,
        })
    }

    /// Create a classifier over the built-in lexicon
    pub fn builtin() -> Result<Self> {
        Self::new("lexicon", &WordList::builtin_lexicon())
    }

    /// Number of roots in the lexicon
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::builtin().expect("Failed to create lexicon classifier")
    }
}

/// Fold text into the form the lexicon is matched against
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '$' | '5' => 's',
            '@' | '4' => 'a',
            '0' => 'o',
            '1' | '!' | '|' => 'i',
            '3' => 'e',
            '7' => 't',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

#[async_trait::async_trait]
impl Classifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let folded = fold(text);
        let matches: Vec<_> = self.matcher.find_iter(&folded).collect();

        let (label, score) = if matches.is_empty() {
            ("clean", 0.0)
        } else {
            ("profanity", 1.0) // Lexicon hits are binary
        };

        Ok(ClassificationResult {
            label: label.to_string(),
            score,
            metadata: ClassificationMetadata {
                spans: matches.iter().map(|m| (m.start(), m.end())).collect(),
                model: Some("profanity-lexicon".to_string()),
                all_scores: Some(vec![("profanity".to_string(), score)]),
            },
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_leetspeak() {
        assert_eq!(fold("A$$H0LE"), "asshole");
        assert_eq!(fold("sh!t"), "shit");
        assert_eq!(fold("hello there"), "hello there");
    }

    #[tokio::test]
    async fn test_lexicon_classifier_clean() {
        let classifier = LexiconClassifier::builtin().unwrap();

        let result = classifier.classify("good game everyone").await.unwrap();
        assert_eq!(result.label, "clean");
        assert_eq!(result.score, 0.0);
        assert!(result.metadata.spans.is_empty());
    }

    #[tokio::test]
    async fn test_lexicon_classifier_catches_leetspeak() {
        let classifier = LexiconClassifier::builtin().unwrap();

        let result = classifier.classify("you are an a$$hole").await.unwrap();
        assert_eq!(result.label, "profanity");
        assert!(result.exceeds_threshold(0.5));
        assert!(!result.metadata.spans.is_empty());
    }

    #[tokio::test]
    async fn test_lexicon_classifier_custom_roots() {
        let classifier =
            LexiconClassifier::new("custom", &WordList::from_entries(["creeper"])).unwrap();

        assert_eq!(classifier.len(), 1);
        let result = classifier.classify("a CR33PER blew up").await.unwrap();
        assert_eq!(result.score, 1.0);
    }
}
