//! The moderation entry point used by the host
//!
//! [`Moderator`] owns the sender table, the detection service, the event
//! bus and the resolved handler. The host calls [`Moderator::start`] once,
//! then forwards chat, join and quit events.

use crate::config::BreezeConfig;
use crate::events::{ChatEvent, EventBus, MessageProcessed, MessageReceived};
use crate::gate::RateGate;
use crate::handler::{panic_message, ChatHandler, DefaultHandler, HandlerError};
use crate::install::Installation;
use crate::loader::{self, ExtensionRecord};
use crate::message::{HandlerInput, HandlerOutput};
use crate::plugins::PluginCatalog;
use crate::sender::{SenderState, SenderStateStore, SenderStateView};
use crate::stats::{ModerationStats, StatsSnapshot};
use breeze_core::Result;
use breeze_filters::DetectionService;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which handler answers chat messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Startup has not run yet
    None,
    Default,
    Custom,
}

/// Moderation pipeline for one chat server
pub struct Moderator {
    config: BreezeConfig,
    detection: Arc<DetectionService>,
    senders: Arc<SenderStateStore>,
    events: Arc<EventBus>,
    default_handler: DefaultHandler,
    custom_handler: Option<Arc<dyn ChatHandler>>,
    state: HandlerState,
    stats: ModerationStats,
    extensions: Vec<ExtensionRecord>,
}

impl Moderator {
    /// Create a moderator around an existing detection service
    pub fn new(config: BreezeConfig, detection: DetectionService) -> Self {
        let default_handler =
            DefaultHandler::new(RateGate::new(config.cooldown()), config.spam_notice.clone());

        Self {
            config,
            detection: Arc::new(detection),
            senders: Arc::new(SenderStateStore::new()),
            events: Arc::new(EventBus::new()),
            default_handler,
            custom_handler: None,
            state: HandlerState::None,
            stats: ModerationStats::new(),
            extensions: Vec::new(),
        }
    }

    /// Create a moderator with the built-in layers configured from `config`
    pub fn from_config(config: BreezeConfig) -> Result<Self> {
        let detection = DetectionService::builder()
            .with_config(config.detection.clone())
            .build()?;
        Ok(Self::new(config, detection))
    }

    /// Resolve the handler and load extensions. Runs once, before traffic.
    ///
    /// Nothing here is fatal: every fault is logged and the moderator ends
    /// up in the `Default` state at worst.
    pub fn start(&mut self, catalog: &PluginCatalog, installation: Option<&Installation>) {
        if self.state != HandlerState::None {
            warn!(state = ?self.state, "Moderator already started");
            return;
        }

        let Some(installation) = installation else {
            error!("Breeze was not installed; extensions are disabled and the default handler is used");
            self.state = HandlerState::Default;
            return;
        };

        if let Err(e) = installation.prepare() {
            warn!(root = %installation.root().display(), error = %e, "Failed to prepare installation");
        }

        let dir = installation.extensions_dir();
        let artifacts = match loader::discover(&dir) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to list extensions");
                self.state = HandlerState::Default;
                return;
            }
        };

        self.state = HandlerState::Default;
        if let Some(path) = &artifacts.handler {
            match loader::bind_handler(path, catalog) {
                Ok(handler) => {
                    info!(handler = handler.name(), "Custom handler bound");
                    self.custom_handler = Some(handler);
                    self.state = HandlerState::Custom;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to bind custom handler, using the default handler");
                }
            }
        } else {
            debug!("No custom handler artifact, using the default handler");
        }

        let view = self.sender_view();
        for path in &artifacts.extensions {
            let record = loader::load_extension(path, catalog, &self.events, &view, &self.detection);
            self.extensions.push(record);
        }

        info!(
            state = ?self.state,
            extensions = self.extensions.len(),
            loaded = self.extensions.iter().filter(|r| r.loaded).count(),
            "Breeze started"
        );
    }

    /// Install a custom handler directly, bypassing the catalog
    pub fn set_custom_handler(&mut self, handler: Arc<dyn ChatHandler>) {
        self.custom_handler = Some(handler);
        self.state = HandlerState::Custom;
    }

    pub fn handler_state(&self) -> HandlerState {
        self.state
    }

    /// Name of the handler currently answering messages
    pub fn handler_name(&self) -> &str {
        match (&self.state, &self.custom_handler) {
            (HandlerState::Custom, Some(handler)) => handler.name(),
            _ => self.default_handler.name(),
        }
    }

    /// Decide one chat message.
    ///
    /// Messages from one sender are decided one at a time; a failed custom
    /// handler and its fallback happen within the same turn.
    pub async fn on_chat(&self, input: HandlerInput) -> HandlerOutput {
        let sender_id = input.sender.id().to_string();
        let sender_name = input.sender.name().to_string();
        let _turn = self.senders.begin_turn(&sender_id).await;

        self.events.emit(&ChatEvent::Received(MessageReceived {
            sender_id: sender_id.clone(),
            sender_name: sender_name.clone(),
            message: input.message.clone(),
            recipients: input.recipients.clone(),
        }));

        let (output, handler) = match (&self.state, &self.custom_handler) {
            (HandlerState::Custom, Some(custom)) => {
                let before = self.senders.get(&sender_id);
                match self.invoke_custom(custom.as_ref(), &input).await {
                    Ok(output) => (output, custom.name().to_string()),
                    Err(e) => {
                        warn!(
                            handler = custom.name(),
                            sender = %sender_id,
                            error = %e,
                            "Custom handler failed, falling back to the default handler"
                        );
                        self.stats.record_fallback(e.reason());
                        self.senders.roll_back(&sender_id, before, &input.message);
                        let output = self.default_handler.evaluate(&input, &self.senders, &self.detection).await;
                        (output, self.default_handler.name().to_string())
                    }
                }
            }
            _ => {
                let output = self.default_handler.evaluate(&input, &self.senders, &self.detection).await;
                (output, self.default_handler.name().to_string())
            }
        };

        self.stats.record(&output);

        self.events.emit(&ChatEvent::Processed(MessageProcessed {
            sender_id,
            sender_name,
            handler,
            is_bad: output.is_bad,
            output: output.clone(),
        }));

        output
    }

    async fn invoke_custom(
        &self,
        handler: &dyn ChatHandler,
        input: &HandlerInput,
    ) -> std::result::Result<HandlerOutput, HandlerError> {
        let call = AssertUnwindSafe(handler.handle(input, &self.senders, &self.detection)).catch_unwind();

        match tokio::time::timeout(self.config.handler_timeout(), call).await {
            Ok(Ok(Ok(output))) => {
                output.validate(input)?;
                Ok(output)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(payload)) => Err(HandlerError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(HandlerError::TimedOut(self.config.handler_timeout_ms)),
        }
    }

    /// A sender joined: start with the cooldown expired and no last message
    pub fn on_join(&self, sender_id: &str) {
        self.senders.reset(sender_id);
        debug!(sender = sender_id, "Sender joined");
    }

    /// A sender left: forget their state
    pub fn on_quit(&self, sender_id: &str) {
        self.senders.remove(sender_id);
        debug!(sender = sender_id, "Sender quit");
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn detection(&self) -> &Arc<DetectionService> {
        &self.detection
    }

    pub fn config(&self) -> &BreezeConfig {
        &self.config
    }

    /// Snapshot of one sender's state
    pub fn sender_state(&self, sender_id: &str) -> Option<SenderState> {
        self.senders.get(sender_id)
    }

    /// Read-only handle on the sender table
    pub fn sender_view(&self) -> SenderStateView {
        SenderStateView::new(self.senders.clone())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// What happened to each extension at startup
    pub fn extension_records(&self) -> &[ExtensionRecord] {
        &self.extensions
    }
}
