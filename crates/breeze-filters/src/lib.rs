//! Breeze Filters
//!
//! Tokenizer, detection layers and censor rendering for chat moderation.
//!
//! Layers are independent and trade recall for precision differently:
//! - Statistical: a classifier over sliding word windows; generalizes to
//!   unseen misspellings
//! - Extralist: fuzzy edit-distance match against a small curated blacklist
//! - Longlist: literal substring match against a large wordlist
//! - Toxicity (optional): whole-message category scoring
//!
//! All of them are pure with respect to their input and run concurrently
//! inside [`DetectionService`].

pub mod censor;
pub mod classifier;
pub mod config;
pub mod distance;
pub mod extralist;
pub mod layer;
pub mod lexicon;
pub mod longlist;
pub mod service;
pub mod statistical;
pub mod tokenizer;
pub mod toxicity;
pub mod wordlists;

pub use censor::{render, CensorMask, DEFAULT_REPLACEMENT};
pub use classifier::{ClassificationResult, Classifier};
pub use config::{DetectionConfig, LayerSettings, LayerToggles, LayersConfig, WordListFiles};
pub use extralist::ExtralistLayer;
pub use layer::{CensorOptions, DetectionLayer};
pub use lexicon::LexiconClassifier;
pub use longlist::LonglistLayer;
pub use service::{DetectionReport, DetectionService, DetectionServiceBuilder};
pub use statistical::StatisticalLayer;
pub use tokenizer::Tokenizer;
pub use toxicity::ToxicityLayer;
pub use wordlists::WordList;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::config::{DetectionConfig, LayerToggles};
    pub use crate::layer::{CensorOptions, DetectionLayer};
    pub use crate::service::{DetectionReport, DetectionService};
    pub use crate::tokenizer::Tokenizer;
}
