//! Configuration for detection layers

use breeze_core::LayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::censor::DEFAULT_REPLACEMENT;

/// Configuration for the detection service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Character written over masked words
    #[serde(default = "default_replacement")]
    pub replacement: char,

    /// Upper bound on a single layer's evaluation
    #[serde(default = "default_layer_timeout_ms")]
    pub layer_timeout_ms: u64,

    /// Per-layer settings
    #[serde(default)]
    pub layers: LayersConfig,

    /// Extra word list files merged over the built-in lists
    #[serde(default)]
    pub wordlists: WordListFiles,
}

impl DetectionConfig {
    /// Timeout applied to each layer
    pub fn layer_timeout(&self) -> Duration {
        Duration::from_millis(self.layer_timeout_ms)
    }

    /// Resolve whether a layer runs, applying per-call overrides
    pub fn is_enabled(&self, layer: LayerId, overrides: Option<&LayerToggles>) -> bool {
        let default = self.layers.get(layer).enabled;
        overrides
            .and_then(|toggles| toggles.get(layer))
            .unwrap_or(default)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            replacement: default_replacement(),
            layer_timeout_ms: default_layer_timeout_ms(),
            layers: LayersConfig::default(),
            wordlists: WordListFiles::default(),
        }
    }
}

/// Settings of every layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersConfig {
    #[serde(default = "LayerSettings::toxicity")]
    pub toxicity: LayerSettings,

    #[serde(default = "LayerSettings::statistical")]
    pub statistical: LayerSettings,

    #[serde(default = "LayerSettings::extralist")]
    pub extralist: LayerSettings,

    #[serde(default = "LayerSettings::longlist")]
    pub longlist: LayerSettings,
}

impl LayersConfig {
    /// Settings for one layer
    pub fn get(&self, layer: LayerId) -> &LayerSettings {
        match layer {
            LayerId::Toxicity => &self.toxicity,
            LayerId::Statistical => &self.statistical,
            LayerId::Extralist => &self.extralist,
            LayerId::Longlist => &self.longlist,
        }
    }
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            toxicity: LayerSettings::toxicity(),
            statistical: LayerSettings::statistical(),
            extralist: LayerSettings::extralist(),
            longlist: LayerSettings::longlist(),
        }
    }
}

/// Settings for a single layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Whether the layer runs unless overridden per call
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Word tokens masked on each side of a hit
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Word tokens per classifier window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Score at or above which a classifier-backed layer flags
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl LayerSettings {
    fn toxicity() -> Self {
        Self {
            enabled: true,
            neighbors: 0,
            window_size: 1,
            threshold: 0.54,
        }
    }

    fn statistical() -> Self {
        Self {
            enabled: true,
            neighbors: 2,
            window_size: 1,
            threshold: 0.5,
        }
    }

    fn extralist() -> Self {
        Self {
            enabled: true,
            neighbors: 2,
            window_size: 1,
            threshold: default_threshold(),
        }
    }

    fn longlist() -> Self {
        Self {
            enabled: true,
            neighbors: 1,
            window_size: 1,
            threshold: default_threshold(),
        }
    }
}

/// Optional word list files, merged over the built-in lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordListFiles {
    pub extralist: Option<PathBuf>,
    pub allowlist: Option<PathBuf>,
    pub longlist: Option<PathBuf>,
}

/// Per-invocation `{layer: enabled}` overrides.
///
/// Layers missing from the map keep their configured setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerToggles(HashMap<LayerId, bool>);

impl LayerToggles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles that switch every layer off
    pub fn all_disabled() -> Self {
        Self(LayerId::ALL.iter().map(|id| (*id, false)).collect())
    }

    /// Set a layer's toggle
    pub fn with(mut self, layer: LayerId, enabled: bool) -> Self {
        self.0.insert(layer, enabled);
        self
    }

    pub fn get(&self, layer: LayerId) -> Option<bool> {
        self.0.get(&layer).copied()
    }
}

impl FromIterator<(LayerId, bool)> for LayerToggles {
    fn from_iter<T: IntoIterator<Item = (LayerId, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn default_replacement() -> char {
    DEFAULT_REPLACEMENT
}

fn default_layer_timeout_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_neighbors() -> usize {
    1
}

fn default_window_size() -> usize {
    1
}

fn default_threshold() -> f32 {
    0.5
}
