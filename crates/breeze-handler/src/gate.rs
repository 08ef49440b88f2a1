//! Per-sender cooldown gate
//!
//! The gate runs before anything looks at the message text. A throttled
//! message is never tokenized and never reaches a detection layer.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of the gate for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The message may be inspected and delivered
    Allowed,

    /// The message arrived inside the cooldown and is fully cancelled
    Throttled {
        /// Sampled so that some throttled events still show up in the logs
        worth_recording: bool,
    },
}

impl GateDecision {
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Cooldown check against the sender's previous message time
#[derive(Debug, Clone, Copy)]
pub struct RateGate {
    cooldown: Duration,
    record_one_in: u32,
}

impl RateGate {
    /// Create a gate with the given cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            record_one_in: 3,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide using the thread-local RNG for the recording sample
    pub fn check(&self, now: Instant, last_message_time: Option<Instant>) -> GateDecision {
        self.check_with(now, last_message_time, &mut rand::thread_rng())
    }

    /// Decide with an explicit RNG. A sender with no previous message always passes.
    pub fn check_with<R: Rng + ?Sized>(
        &self,
        now: Instant,
        last_message_time: Option<Instant>,
        rng: &mut R,
    ) -> GateDecision {
        match last_message_time {
            Some(last) if now.saturating_duration_since(last) < self.cooldown => {
                GateDecision::Throttled {
                    worth_recording: rng.gen_ratio(1, self.record_one_in),
                }
            }
            _ => GateDecision::Allowed,
        }
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}
