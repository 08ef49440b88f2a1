//! Plugins compiled into the console host
//!
//! Manifests in the extensions directory can bind any of these by name:
//! - `strict` (handler): withholds flagged messages instead of censoring them
//! - `chat-log` (extension): logs every decision
//! - `bad-words` (extension): counts flagged messages per sender and warns
//!   once a sender reaches `warn_after`

use async_trait::async_trait;
use breeze_filters::DetectionService;
use breeze_handler::{
    CancelReason, ChatHandler, DefaultHandler, Extension, ExtensionContext, HandlerError,
    HandlerInput, HandlerOutput, PluginCatalog, RateGate, SenderStateStore,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Catalog with every built-in plugin registered
pub fn builtin_catalog(gate: RateGate, spam_notice: &str) -> PluginCatalog {
    let spam_notice = spam_notice.to_string();
    let mut catalog = PluginCatalog::new();
    catalog
        .register_handler("strict", move |settings| {
            let reason = settings.get_or("reason", "profanity".to_string())?;
            Ok(Arc::new(StrictHandler::new(
                DefaultHandler::new(gate, spam_notice.clone()),
                reason,
            )) as Arc<dyn ChatHandler>)
        })
        .register_extension("chat-log", Arc::new(ChatLog))
        .register_extension("bad-words", Arc::new(BadWordCounter::default()));
    catalog
}

/// Runs the default pipeline, then withholds anything flagged
pub struct StrictHandler {
    inner: DefaultHandler,
    reason: String,
}

impl StrictHandler {
    pub fn new(inner: DefaultHandler, reason: impl Into<String>) -> Self {
        Self {
            inner,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ChatHandler for StrictHandler {
    fn name(&self) -> &str {
        "strict"
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> Result<HandlerOutput, HandlerError> {
        let mut output = self.inner.evaluate(input, senders, detection).await;
        if output.is_bad && !output.fully_cancel_message {
            output.fully_cancel_message = true;
            output.cancel_reason = Some(CancelReason::Handler(self.reason.clone()));
        }
        Ok(output)
    }
}

/// Logs each decision
pub struct ChatLog;

impl Extension for ChatLog {
    fn on_load(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        let prefix: String = ctx.settings().get_or("prefix", "[chat]".to_string())?;

        ctx.on_message_processed(move |event| {
            info!(
                prefix = %prefix,
                sender = %event.sender_name,
                handler = %event.handler,
                is_bad = event.is_bad,
                cancelled = event.output.fully_cancel_message,
                "{}",
                event.output.finished_message
            );
            Ok(())
        });
        Ok(())
    }
}

/// Flagged message counts per sender
#[derive(Default)]
pub struct BadWordCounter {
    counts: Arc<Mutex<HashMap<String, u32>>>,
}

impl BadWordCounter {
    pub fn count(&self, sender_id: &str) -> u32 {
        self.counts.lock().get(sender_id).copied().unwrap_or(0)
    }
}

impl Extension for BadWordCounter {
    fn on_load(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        let warn_after: u32 = ctx.settings().get_or("warn_after", 3)?;
        anyhow::ensure!(warn_after > 0, "warn_after must be positive");

        let counts = self.counts.clone();
        ctx.on_message_processed(move |event| {
            if !event.is_bad {
                return Ok(());
            }
            let mut counts = counts.lock();
            let count = counts.entry(event.sender_id.clone()).or_default();
            *count += 1;
            if *count == warn_after {
                warn!(sender = %event.sender_name, count = *count, "Sender keeps getting flagged");
            }
            Ok(())
        });
        Ok(())
    }
}
