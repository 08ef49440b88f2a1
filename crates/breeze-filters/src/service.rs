//! Detection service: runs every enabled layer and renders the result
//!
//! Layers run concurrently. Each one is bounded by the configured timeout;
//! a layer that errors or times out abstains without affecting the others.
//! Verdicts and masks are OR-combined once all layers have finished.

use crate::censor::{render, CensorMask};
use crate::classifier::Classifier;
use crate::config::{DetectionConfig, LayerToggles};
use crate::extralist::ExtralistLayer;
use crate::layer::{CensorOptions, DetectionLayer};
use crate::lexicon::LexiconClassifier;
use crate::longlist::LonglistLayer;
use crate::statistical::StatisticalLayer;
use crate::tokenizer::Tokenizer;
use crate::toxicity::ToxicityLayer;
use crate::wordlists::WordList;
use breeze_core::{DetectionVerdict, LayerId, Result, Token};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of running the layer stack over one message
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Censored rendering of the message
    pub finished_message: String,

    /// Whether any layer caught the message
    pub is_bad: bool,

    /// Layers that caught the message, in evaluation order
    pub caught: Vec<LayerId>,

    /// One verdict per layer that ran
    pub verdicts: Vec<DetectionVerdict>,

    /// Tokens the layers saw
    pub tokens: Vec<Token>,

    /// Combined mask applied to `tokens`
    pub mask: CensorMask,

    /// Total execution time
    pub latency_us: u64,
}

struct LayerOutcome {
    verdict: DetectionVerdict,
    mask: Option<CensorMask>,
}

/// The tokenizer plus the layer stack
pub struct DetectionService {
    tokenizer: Tokenizer,
    layers: Vec<Arc<dyn DetectionLayer>>,
    config: DetectionConfig,
}

impl DetectionService {
    /// Start building a service
    pub fn builder() -> DetectionServiceBuilder {
        DetectionServiceBuilder::new()
    }

    /// Service with the built-in lexicon, extralist and longlist layers
    pub fn builtin() -> Result<Self> {
        Self::builder().build()
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenize a message
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenizer.tokenize(text)
    }

    /// Identifiers of installed layers, in evaluation order
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id()).collect()
    }

    /// Whether any enabled layer considers the text profane
    pub async fn is_profane(&self, text: &str, toggles: Option<&LayerToggles>) -> bool {
        self.check_and_censor(text, toggles).await.is_bad
    }

    /// Run every enabled layer and render the combined mask
    pub async fn check_and_censor(&self, text: &str, toggles: Option<&LayerToggles>) -> DetectionReport {
        let start = Instant::now();
        let tokens = self.tokenizer.tokenize(text);

        let enabled: Vec<&Arc<dyn DetectionLayer>> = self
            .layers
            .iter()
            .filter(|layer| self.config.is_enabled(layer.id(), toggles))
            .collect();

        let outcomes = join_all(
            enabled
                .iter()
                .map(|layer| self.evaluate_layer(layer.as_ref(), &tokens)),
        )
        .await;

        let mut mask = CensorMask::new(tokens.len());
        let mut caught = Vec::new();
        let mut verdicts = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if outcome.verdict.caught {
                caught.push(outcome.verdict.layer);
            }
            if let Some(layer_mask) = &outcome.mask {
                mask.merge(layer_mask);
            }
            verdicts.push(outcome.verdict);
        }

        let is_bad = !caught.is_empty();
        let finished_message = if is_bad {
            render(&tokens, &mask, self.config.replacement)
        } else {
            text.to_string()
        };

        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!("breeze_detection_latency_us").record(latency_us as f64);
        debug!(is_bad, caught = ?caught, latency_us, "Detection finished");

        DetectionReport {
            finished_message,
            is_bad,
            caught,
            verdicts,
            tokens,
            mask,
            latency_us,
        }
    }

    /// Evaluate one layer under the timeout, turning faults into abstentions
    async fn evaluate_layer(&self, layer: &dyn DetectionLayer, tokens: &[Token]) -> LayerOutcome {
        let id = layer.id();
        let settings = self.config.layers.get(id);
        let options = CensorOptions {
            replacement: self.config.replacement,
            neighbors: settings.neighbors,
            window_size: settings.window_size,
        };

        let run = async {
            if layer.is_profane(tokens).await? {
                layer.mask(tokens, &options).await.map(Some)
            } else {
                Ok(None)
            }
        };

        match tokio::time::timeout(self.config.layer_timeout(), run).await {
            Ok(Ok(mask)) => LayerOutcome {
                verdict: DetectionVerdict::new(id, mask.is_some()),
                mask,
            },
            Ok(Err(e)) => {
                warn!(layer = %id, error = %e, "Detection layer failed, abstaining");
                metrics::counter!("breeze_layer_abstentions_total", "layer" => id.as_str()).increment(1);
                LayerOutcome {
                    verdict: DetectionVerdict::abstain(id),
                    mask: None,
                }
            }
            Err(_) => {
                warn!(
                    layer = %id,
                    timeout_ms = self.config.layer_timeout_ms,
                    "Detection layer timed out, abstaining"
                );
                metrics::counter!("breeze_layer_abstentions_total", "layer" => id.as_str()).increment(1);
                LayerOutcome {
                    verdict: DetectionVerdict::abstain(id),
                    mask: None,
                }
            }
        }
    }
}

/// Builder for [`DetectionService`]
pub struct DetectionServiceBuilder {
    config: DetectionConfig,
    statistical: Option<Arc<dyn Classifier>>,
    toxicity: Option<Arc<dyn Classifier>>,
    extralist: Option<WordList>,
    allowlist: Option<WordList>,
    longlist: Option<WordList>,
    overrides: Vec<Arc<dyn DetectionLayer>>,
}

impl DetectionServiceBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
            statistical: None,
            toxicity: None,
            extralist: None,
            allowlist: None,
            longlist: None,
            overrides: Vec::new(),
        }
    }

    /// Use the given configuration
    pub fn with_config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Back the statistical layer with a different classifier
    pub fn with_statistical_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.statistical = Some(classifier);
        self
    }

    /// Install the toxicity layer backed by a category-scoring classifier
    pub fn with_toxicity_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.toxicity = Some(classifier);
        self
    }

    /// Replace the built-in extralist
    pub fn with_extralist(mut self, list: WordList) -> Self {
        self.extralist = Some(list);
        self
    }

    /// Replace the built-in allow-list
    pub fn with_allowlist(mut self, list: WordList) -> Self {
        self.allowlist = Some(list);
        self
    }

    /// Replace the built-in longlist
    pub fn with_longlist(mut self, list: WordList) -> Self {
        self.longlist = Some(list);
        self
    }

    /// Install a layer, replacing any layer with the same id
    pub fn with_layer(mut self, layer: Arc<dyn DetectionLayer>) -> Self {
        self.overrides.push(layer);
        self
    }

    /// Build the service
    pub fn build(self) -> Result<DetectionService> {
        let files = &self.config.wordlists;
        let extralist = merged_list(self.extralist, WordList::builtin_extralist, files.extralist.as_ref())?;
        let allowlist = merged_list(self.allowlist, WordList::builtin_allowlist, files.allowlist.as_ref())?;
        let longlist = merged_list(self.longlist, WordList::builtin_longlist, files.longlist.as_ref())?;

        let mut layers: Vec<Arc<dyn DetectionLayer>> = Vec::new();

        if let Some(classifier) = self.toxicity {
            layers.push(Arc::new(ToxicityLayer::new(
                classifier,
                self.config.layers.toxicity.threshold,
            )));
        }

        let statistical = match self.statistical {
            Some(classifier) => classifier,
            None => Arc::new(LexiconClassifier::builtin()?),
        };
        layers.push(Arc::new(StatisticalLayer::new(
            statistical,
            self.config.layers.statistical.threshold,
        )));
        layers.push(Arc::new(ExtralistLayer::new(&extralist, &allowlist)));
        layers.push(Arc::new(LonglistLayer::new(&longlist)?));

        for layer in self.overrides {
            match layers.iter().position(|l| l.id() == layer.id()) {
                Some(index) => layers[index] = layer,
                None => layers.push(layer),
            }
        }
        layers.sort_by_key(|l| l.id());

        Ok(DetectionService {
            tokenizer: Tokenizer::new()?,
            layers,
            config: self.config,
        })
    }
}

impl Default for DetectionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn merged_list(
    explicit: Option<WordList>,
    builtin: fn() -> WordList,
    file: Option<&std::path::PathBuf>,
) -> Result<WordList> {
    let mut list = explicit.unwrap_or_else(builtin);
    if let Some(path) = file {
        let extra = WordList::from_file(path).map_err(|e| {
            breeze_core::Error::config(format!("Failed to read word list {}: {}", path.display(), e))
        })?;
        list.extend(&extra);
    }
    Ok(list)
}
