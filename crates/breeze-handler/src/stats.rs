//! Moderation counters
//!
//! Every recorded decision also goes to the `metrics` facade, so a host that
//! installs a recorder gets the same numbers that [`ModerationStats`] keeps
//! in process.

use crate::message::{CancelReason, HandlerOutput};
use breeze_core::LayerId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-process moderation counters
#[derive(Clone, Default)]
pub struct ModerationStats {
    inner: Arc<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    messages: AtomicU64,
    flagged: AtomicU64,
    rate_limited: AtomicU64,
    cancelled: AtomicU64,
    fallbacks: AtomicU64,
    caught_by: [AtomicU64; 4],
}

fn layer_index(layer: LayerId) -> usize {
    LayerId::ALL
        .iter()
        .position(|id| *id == layer)
        .unwrap_or_default()
}

impl ModerationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decided message
    pub fn record(&self, output: &HandlerOutput) {
        let inner = &self.inner;
        inner.messages.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("breeze_messages_total").increment(1);

        if output.is_bad {
            inner.flagged.fetch_add(1, Ordering::Relaxed);
        }
        for layer in &output.caught {
            inner.caught_by[layer_index(*layer)].fetch_add(1, Ordering::Relaxed);
            metrics::counter!("breeze_messages_flagged_total", "layer" => layer.as_str()).increment(1);
        }

        if output.fully_cancel_message {
            inner.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        if output.cancel_reason == Some(CancelReason::RateLimited) {
            inner.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a fallback from a custom handler to the default one
    pub fn record_fallback(&self, reason: &'static str) {
        self.inner.fallbacks.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("breeze_handler_fallbacks_total", "reason" => reason).increment(1);
    }

    /// Get current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = &self.inner;
        StatsSnapshot {
            messages: inner.messages.load(Ordering::Relaxed),
            flagged: inner.flagged.load(Ordering::Relaxed),
            rate_limited: inner.rate_limited.load(Ordering::Relaxed),
            cancelled: inner.cancelled.load(Ordering::Relaxed),
            fallbacks: inner.fallbacks.load(Ordering::Relaxed),
            caught_by: LayerId::ALL
                .iter()
                .map(|layer| (*layer, inner.caught_by[layer_index(*layer)].load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Snapshot of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub messages: u64,
    pub flagged: u64,
    pub rate_limited: u64,
    pub cancelled: u64,
    pub fallbacks: u64,
    pub caught_by: Vec<(LayerId, u64)>,
}

impl StatsSnapshot {
    /// Share of decided messages that were flagged
    pub fn flag_rate(&self) -> f64 {
        if self.messages == 0 {
            0.0
        } else {
            self.flagged as f64 / self.messages as f64
        }
    }

    pub fn caught_by(&self, layer: LayerId) -> u64 {
        self.caught_by
            .iter()
            .find(|(id, _)| *id == layer)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_collection() {
        let stats = ModerationStats::new();

        stats.record(&HandlerOutput::pass("hello"));

        let mut bad = HandlerOutput::pass("bad");
        bad.is_bad = true;
        bad.caught = vec![LayerId::Extralist, LayerId::Longlist];
        stats.record(&bad);

        stats.record(&HandlerOutput::cancelled("spam", CancelReason::RateLimited));
        stats.record_fallback("panicked");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages, 3);
        assert_eq!(snapshot.flagged, 1);
        assert_eq!(snapshot.rate_limited, 1);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.fallbacks, 1);
        assert_eq!(snapshot.caught_by(LayerId::Longlist), 1);
        assert_eq!(snapshot.caught_by(LayerId::Statistical), 0);
        assert!((snapshot.flag_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = ModerationStats::new();
        let clone = stats.clone();
        clone.record(&HandlerOutput::pass("hi"));
        assert_eq!(stats.snapshot().messages, 1);
    }
}
