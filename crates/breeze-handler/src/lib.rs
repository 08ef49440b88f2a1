//! Breeze Handler
//!
//! Everything between the host's chat event and the detection service:
//! - Per-sender state and the cooldown gate
//! - The default handler and the custom-handler fallback
//! - The event bus extensions observe the pipeline through
//! - The plugin catalog, extension loading and installation layout
//!
//! Hosts drive it through [`Moderator`].

pub mod config;
pub mod events;
pub mod gate;
pub mod handler;
pub mod install;
pub mod loader;
pub mod message;
pub mod moderator;
pub mod plugins;
pub mod sender;
pub mod stats;

pub use config::{BreezeConfig, InstallConfig};
pub use events::{ChatEvent, EventBus, EventKind, MessageProcessed, MessageReceived};
pub use gate::{GateDecision, RateGate};
pub use handler::{ChatHandler, DefaultHandler, HandlerError};
pub use install::{InstallSource, Installation};
pub use loader::{Artifacts, ExtensionRecord, HANDLER_ARTIFACT};
pub use message::{CancelReason, HandlerInput, HandlerOutput, Participant};
pub use moderator::{HandlerState, Moderator};
pub use plugins::{ArtifactManifest, Extension, ExtensionContext, PluginCatalog, PluginSettings};
pub use sender::{SenderState, SenderStateStore, SenderStateView};
pub use stats::{ModerationStats, StatsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::handler::{ChatHandler, DefaultHandler, HandlerError};
    pub use crate::message::{HandlerInput, HandlerOutput, Participant};
    pub use crate::moderator::Moderator;
    pub use crate::plugins::{Extension, ExtensionContext, PluginCatalog};
    pub use crate::sender::SenderStateStore;
}
