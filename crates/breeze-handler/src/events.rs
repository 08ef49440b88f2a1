//! Event bus for observers
//!
//! Two events per message: [`ChatEvent::Received`] before the decision and
//! [`ChatEvent::Processed`] after it. Subscribers run synchronously in
//! subscription order. They only observe: a subscriber that errors or panics
//! is logged and skipped, and delivery continues with the next one.

use crate::handler::panic_message;
use crate::message::HandlerOutput;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Kinds of events on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    MessageReceived,
    MessageProcessed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageReceived => "message-received",
            Self::MessageProcessed => "message-processed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message arrived and is about to be decided
#[derive(Debug, Clone, Serialize)]
pub struct MessageReceived {
    pub sender_id: String,
    pub sender_name: String,
    pub message: String,
    pub recipients: Vec<String>,
}

/// A message has been decided
#[derive(Debug, Clone, Serialize)]
pub struct MessageProcessed {
    pub sender_id: String,
    pub sender_name: String,

    /// Name of the handler whose output this is
    pub handler: String,

    pub is_bad: bool,
    pub output: HandlerOutput,
}

/// An event with its payload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ChatEvent {
    Received(MessageReceived),
    Processed(MessageProcessed),
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Received(_) => EventKind::MessageReceived,
            Self::Processed(_) => EventKind::MessageProcessed,
        }
    }
}

type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

struct Subscription<T> {
    owner: String,
    callback: Callback<T>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            callback: self.callback.clone(),
        }
    }
}

/// Ordered subscriber lists per event kind
#[derive(Default)]
pub struct EventBus {
    received: RwLock<Vec<Subscription<MessageReceived>>>,
    processed: RwLock<Vec<Subscription<MessageProcessed>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to [`ChatEvent::Received`]
    pub fn on_message_received<F>(&self, owner: impl Into<String>, callback: F)
    where
        F: Fn(&MessageReceived) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let owner = owner.into();
        debug!(owner = %owner, event = %EventKind::MessageReceived, "Subscriber registered");
        self.received.write().push(Subscription {
            owner,
            callback: Arc::new(callback),
        });
    }

    /// Subscribe to [`ChatEvent::Processed`]
    pub fn on_message_processed<F>(&self, owner: impl Into<String>, callback: F)
    where
        F: Fn(&MessageProcessed) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let owner = owner.into();
        debug!(owner = %owner, event = %EventKind::MessageProcessed, "Subscriber registered");
        self.processed.write().push(Subscription {
            owner,
            callback: Arc::new(callback),
        });
    }

    /// Deliver an event to every subscriber of its kind.
    ///
    /// Returns how many subscribers faulted.
    pub fn emit(&self, event: &ChatEvent) -> usize {
        let kind = event.kind();
        match event {
            ChatEvent::Received(payload) => {
                let subscribers = self.received.read().clone();
                deliver(kind, &subscribers, payload)
            }
            ChatEvent::Processed(payload) => {
                let subscribers = self.processed.read().clone();
                deliver(kind, &subscribers, payload)
            }
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::MessageReceived => self.received.read().len(),
            EventKind::MessageProcessed => self.processed.read().len(),
        }
    }

    /// Subscribers across all event kinds
    pub fn total_subscribers(&self) -> usize {
        self.received.read().len() + self.processed.read().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("received", &self.received.read().len())
            .field("processed", &self.processed.read().len())
            .finish()
    }
}

fn deliver<T>(kind: EventKind, subscribers: &[Subscription<T>], payload: &T) -> usize {
    let mut faults = 0;
    for subscriber in subscribers {
        match catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(payload))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                faults += 1;
                warn!(owner = %subscriber.owner, event = %kind, error = %e, "Event subscriber failed");
            }
            Err(payload) => {
                faults += 1;
                error!(
                    owner = %subscriber.owner,
                    event = %kind,
                    panic = %panic_message(payload.as_ref()),
                    "Event subscriber panicked"
                );
            }
        }
    }
    faults
}
