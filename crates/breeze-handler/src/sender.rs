//! Per-sender message state
//!
//! One entry per active sender, keyed by sender id. Entries are created on
//! join or on the first message and removed on quit. Each entry has its own
//! lock so that the cooldown check and the state update for one sender form
//! a single critical section without serializing unrelated senders.

use crate::gate::{GateDecision, RateGate};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

/// What the gate remembers about a sender
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderState {
    /// When the last message arrived; `None` means the cooldown has expired
    pub last_message_time: Option<Instant>,

    /// The last message exactly as typed
    pub last_message: String,
}

/// Exclusive right to decide the next message of one sender
pub type SenderTurn = tokio::sync::OwnedMutexGuard<()>;

/// Table of sender states
#[derive(Debug, Default)]
pub struct SenderStateStore {
    states: RwLock<HashMap<String, Arc<Mutex<SenderState>>>>,
    turns: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SenderStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &str) -> Arc<Mutex<SenderState>> {
        if let Some(state) = self.states.read().get(id) {
            return state.clone();
        }
        self.states
            .write()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Run `f` on the live entry for `id`, creating it if needed.
    ///
    /// An entry lock is never taken while the map lock is held. After locking
    /// the entry the map is checked again, so a write never lands in an entry
    /// that a concurrent `remove` has already unlinked.
    fn with_entry<R>(&self, id: &str, mut f: impl FnMut(&mut SenderState) -> R) -> R {
        loop {
            let entry = self.entry(id);
            let mut state = entry.lock();
            let live = self
                .states
                .read()
                .get(id)
                .is_some_and(|current| Arc::ptr_eq(current, &entry));
            if live {
                return f(&mut state);
            }
        }
    }

    /// Wait until no other message from `id` is being decided.
    ///
    /// Holding the turn serializes whole decisions for one sender, including
    /// a failed custom handler and its fallback. Other senders are unaffected.
    pub async fn begin_turn(&self, id: &str) -> SenderTurn {
        let turn = self
            .turns
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone();
        turn.lock_owned().await
    }

    /// Create or reset a sender with the cooldown already expired and no last message
    pub fn reset(&self, id: &str) {
        self.with_entry(id, |state| *state = SenderState::default());
    }

    /// Forget a sender
    pub fn remove(&self, id: &str) -> Option<SenderState> {
        let removed = self.states.write().remove(id);

        let mut turns = self.turns.lock();
        if turns.get(id).is_some_and(|turn| Arc::strong_count(turn) == 1) {
            turns.remove(id);
        }
        drop(turns);

        removed.map(|state| state.lock().clone())
    }

    /// Snapshot of a sender's state
    pub fn get(&self, id: &str) -> Option<SenderState> {
        let entry = self.states.read().get(id).cloned();
        entry.map(|state| state.lock().clone())
    }

    /// Record a message without consulting the gate
    pub fn record(&self, id: &str, message: &str, now: Instant) {
        self.with_entry(id, |state| {
            state.last_message_time = Some(now);
            state.last_message = message.to_string();
        });
    }

    /// Check the gate and record the message under one lock.
    ///
    /// The state is updated whether or not the message passes, so a sender
    /// who keeps typing inside the cooldown stays throttled.
    pub fn gate_and_record(
        &self,
        id: &str,
        message: &str,
        now: Instant,
        gate: &RateGate,
    ) -> GateDecision {
        self.with_entry(id, |state| {
            let decision = gate.check(now, state.last_message_time);
            state.last_message_time = Some(now);
            state.last_message = message.to_string();
            decision
        })
    }

    /// Undo what a failed attempt at deciding `message` wrote.
    ///
    /// Only rolls back when the entry still holds `message` and differs from
    /// `before`; a join or quit that happened meanwhile is kept. Call while
    /// holding the sender's turn. A sender unknown before the attempt goes
    /// back to the expired state rather than being removed.
    pub(crate) fn roll_back(&self, id: &str, before: Option<SenderState>, message: &str) -> bool {
        let Some(current) = self.get(id) else {
            return false;
        };
        let before = before.unwrap_or_default();
        if current == before || current.last_message != message {
            return false;
        }
        self.with_entry(id, |state| {
            if state.last_message == message {
                *state = before.clone();
                true
            } else {
                false
            }
        })
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.read().contains_key(id)
    }

    /// Ids of all known senders
    pub fn sender_ids(&self) -> Vec<String> {
        self.states.read().keys().cloned().collect()
    }
}

/// Read-only handle on a [`SenderStateStore`], handed to extensions
#[derive(Debug, Clone)]
pub struct SenderStateView {
    store: Arc<SenderStateStore>,
}

impl SenderStateView {
    pub fn new(store: Arc<SenderStateStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &str) -> Option<SenderState> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn sender_ids(&self) -> Vec<String> {
        self.store.sender_ids()
    }
}
