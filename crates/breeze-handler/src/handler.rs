//! Chat handlers
//!
//! A handler turns one [`HandlerInput`] into one [`HandlerOutput`]. The
//! [`DefaultHandler`] runs the rate gate and the detection service; a custom
//! handler bound from the plugin catalog may replace it, but any failure of
//! the custom handler is answered by the default one.

use crate::gate::{GateDecision, RateGate};
use crate::message::{CancelReason, HandlerInput, HandlerOutput};
use crate::sender::SenderStateStore;
use async_trait::async_trait;
use breeze_filters::{DetectionService, LayerToggles};
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

/// Failure of a handler invocation
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(#[from] anyhow::Error),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler timed out after {0} ms")]
    TimedOut(u64),

    #[error("malformed handler output: {0}")]
    Malformed(String),
}

impl HandlerError {
    /// Label used for the fallback counter
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
            Self::TimedOut(_) => "timed_out",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decision logic for chat messages
#[async_trait]
pub trait ChatHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Decide what happens to one message
    async fn handle(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// Rate gate, then detection, then censoring
#[derive(Debug, Clone)]
pub struct DefaultHandler {
    gate: RateGate,
    spam_notice: String,
    toggles: Option<LayerToggles>,
}

impl DefaultHandler {
    pub fn new(gate: RateGate, spam_notice: impl Into<String>) -> Self {
        Self {
            gate,
            spam_notice: spam_notice.into(),
            toggles: None,
        }
    }

    /// Apply layer toggles to every message this handler evaluates
    pub fn with_toggles(mut self, toggles: LayerToggles) -> Self {
        self.toggles = Some(toggles);
        self
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Evaluate a message. Never fails.
    pub async fn evaluate(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> HandlerOutput {
        let sender = input.sender.id();
        let decision = senders.gate_and_record(sender, &input.message, Instant::now(), &self.gate);

        let (output, tokens) = match decision {
            GateDecision::Throttled { worth_recording } => {
                input.sender.send_message(&self.spam_notice);
                metrics::counter!("breeze_messages_rate_limited_total").increment(1);

                let mut output = HandlerOutput::cancelled(&input.message, CancelReason::RateLimited);
                output.worth_recording = worth_recording;
                (output, None)
            }
            GateDecision::Allowed => {
                let report = detection
                    .check_and_censor(&input.message, self.toggles.as_ref())
                    .await;
                let tokens = report.tokens.clone();
                (HandlerOutput::from_report(&input.message, report), Some(tokens))
            }
        };

        if output.worth_recording {
            let tokens = tokens.unwrap_or_else(|| detection.tokenize(&input.message));
            let token_texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
            info!(
                sender,
                name = input.sender.name(),
                is_bad = output.is_bad,
                fully_cancel_message = output.fully_cancel_message,
                cancel_reason = ?output.cancel_reason,
                caught = ?output.caught,
                tokens = ?token_texts,
                input = %input.message,
                output = %output.finished_message,
                "Moderation record"
            );
        }

        output
    }
}

impl Default for DefaultHandler {
    fn default() -> Self {
        Self::new(RateGate::default(), "You're sending messages too fast!")
    }
}

#[async_trait]
impl ChatHandler for DefaultHandler {
    fn name(&self) -> &str {
        "default"
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> Result<HandlerOutput, HandlerError> {
        Ok(self.evaluate(input, senders, detection).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Participant;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        notices: Mutex<Vec<String>>,
    }

    impl Participant for Recorder {
        fn id(&self) -> &str {
            "alice-id"
        }

        fn name(&self) -> &str {
            "Alice"
        }

        fn send_message(&self, text: &str) {
            self.notices.lock().push(text.to_string());
        }
    }

    #[tokio::test]
    async fn test_clean_message_passes_unchanged() {
        let detection = DetectionService::builtin().unwrap();
        let senders = SenderStateStore::new();
        let handler = DefaultHandler::default();
        let input = HandlerInput::new(Arc::new(Recorder::default()), "hello everyone");

        let output = handler.evaluate(&input, &senders, &detection).await;

        assert!(!output.is_bad);
        assert!(!output.fully_cancel_message);
        assert_eq!(output.finished_message, "hello everyone");
        assert!(!output.worth_recording);
        assert_eq!(senders.get("alice-id").unwrap().last_message, "hello everyone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_message_sends_notice() {
        let detection = DetectionService::builtin().unwrap();
        let senders = SenderStateStore::new();
        let handler = DefaultHandler::default();
        let player = Arc::new(Recorder::default());

        let first = HandlerInput::new(player.clone(), "hello");
        handler.evaluate(&first, &senders, &detection).await;

        tokio::time::advance(Duration::from_millis(100)).await;
        let second = HandlerInput::new(player.clone(), "hello again");
        let output = handler.evaluate(&second, &senders, &detection).await;

        assert!(output.fully_cancel_message);
        assert_eq!(output.cancel_reason, Some(CancelReason::RateLimited));
        assert_eq!(
            player.notices.lock().as_slice(),
            ["You're sending messages too fast!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_toggles_disable_detection() {
        let detection = DetectionService::builtin().unwrap();
        let senders = SenderStateStore::new();
        let handler = DefaultHandler::default().with_toggles(LayerToggles::all_disabled());
        let input = HandlerInput::new(Arc::new(Recorder::default()), "you are an a$$hole");

        let output = handler.evaluate(&input, &senders, &detection).await;

        assert!(!output.is_bad);
        assert_eq!(output.finished_message, output.original_message);
    }

    #[test]
    fn test_error_reasons() {
        assert_eq!(HandlerError::TimedOut(10).reason(), "timed_out");
        assert_eq!(HandlerError::Panicked("boom".into()).reason(), "panicked");
        assert_eq!(
            HandlerError::from(anyhow::anyhow!("nope")).reason(),
            "failed"
        );
    }
}
