//! Dispatcher metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{Counter, Gauge};

#[derive(Clone)]
pub(crate) struct DispatcherMetrics {
    /// Requests delivered successfully.
    pub(crate) sent_total: Counter,
    /// Requests whose delivery failed.
    pub(crate) failed_total: Counter,
    /// Requests that had to wait for the window to reset.
    pub(crate) throttled_total: Counter,
    /// Requests submitted but not yet released to the transport, including
    /// the one waiting for the window to reset.
    queue_depth: Gauge,
    pending: Arc<AtomicUsize>,
}

impl Default for DispatcherMetrics {
    fn default() -> Self {
        Self {
            sent_total: metrics::counter!("dispatcher.sent_total"),
            failed_total: metrics::counter!("dispatcher.failed_total"),
            throttled_total: metrics::counter!("dispatcher.throttled_total"),
            queue_depth: metrics::gauge!("dispatcher.queue_depth"),
            pending: Arc::default(),
        }
    }
}

impl DispatcherMetrics {
    pub(crate) fn enqueued(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.queue_depth.increment(1.0);
    }

    pub(crate) fn released(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.queue_depth.decrement(1.0);
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
