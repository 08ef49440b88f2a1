//! Handler input and output

use crate::handler::HandlerError;
use breeze_core::LayerId;
use breeze_filters::DetectionReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A chat participant as seen by the moderation pipeline.
///
/// Implemented by the host; the only side effect Breeze performs directly is
/// the rate-limit notice sent through [`Participant::send_message`].
pub trait Participant: Send + Sync {
    /// Stable identifier, the key of the sender table
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// Send a private notice to this participant
    fn send_message(&self, text: &str);
}

/// One chat message submitted for moderation
#[derive(Clone)]
pub struct HandlerInput {
    /// Message exactly as typed
    pub message: String,

    /// Who sent it
    pub sender: Arc<dyn Participant>,

    /// Host-side broadcast format, e.g. `<{name}> {message}`
    pub format: String,

    /// Ids of the intended recipients
    pub recipients: Vec<String>,
}

impl HandlerInput {
    pub fn new(sender: Arc<dyn Participant>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sender,
            format: "<{name}> {message}".to_string(),
            recipients: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Apply the broadcast format to a (possibly censored) message
    pub fn render(&self, message: &str) -> String {
        self.format
            .replace("{name}", self.sender.name())
            .replace("{message}", message)
    }
}

impl fmt::Debug for HandlerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInput")
            .field("message", &self.message)
            .field("sender", &self.sender.id())
            .field("format", &self.format)
            .field("recipients", &self.recipients)
            .finish()
    }
}

/// Why a message was withheld entirely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum CancelReason {
    /// Sent inside the sender's cooldown
    RateLimited,
    /// Withheld by a custom handler
    Handler(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::Handler(reason) => write!(f, "handler: {}", reason),
        }
    }
}

/// The decision for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerOutput {
    /// Whether any detection layer caught the message
    pub is_bad: bool,

    /// When set, nothing is broadcast
    pub fully_cancel_message: bool,

    /// What to broadcast
    pub finished_message: String,

    /// The input message, verbatim
    pub original_message: String,

    /// Layers that caught the message
    #[serde(default)]
    pub caught: Vec<LayerId>,

    /// Whether the decision should be written to the moderation log
    #[serde(default)]
    pub worth_recording: bool,

    #[serde(default)]
    pub cancel_reason: Option<CancelReason>,
}

impl HandlerOutput {
    /// Deliver the message unchanged
    pub fn pass(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            is_bad: false,
            fully_cancel_message: false,
            finished_message: message.clone(),
            original_message: message,
            caught: Vec::new(),
            worth_recording: false,
            cancel_reason: None,
        }
    }

    /// Withhold the message
    pub fn cancelled(message: impl Into<String>, reason: CancelReason) -> Self {
        Self {
            fully_cancel_message: true,
            cancel_reason: Some(reason),
            ..Self::pass(message)
        }
    }

    /// Build the output for a message that went through detection
    pub fn from_report(message: impl Into<String>, report: DetectionReport) -> Self {
        Self {
            is_bad: report.is_bad,
            fully_cancel_message: false,
            finished_message: report.finished_message,
            original_message: message.into(),
            caught: report.caught,
            worth_recording: report.is_bad,
            cancel_reason: None,
        }
    }

    /// Shape check applied to custom handler results
    pub fn validate(&self, input: &HandlerInput) -> Result<(), HandlerError> {
        if self.original_message != input.message {
            return Err(HandlerError::Malformed(
                "original_message does not match the input message".to_string(),
            ));
        }
        if !self.fully_cancel_message && self.cancel_reason.is_some() {
            return Err(HandlerError::Malformed(
                "cancel_reason set on a message that is not cancelled".to_string(),
            ));
        }
        Ok(())
    }
}
