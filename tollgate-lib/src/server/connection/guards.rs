use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::telemetry::Metrics;

/// Guard to decrement active connections counter when dropped
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionGuard {
    pub(crate) fn new(counter: Arc<AtomicUsize>, metrics: Option<Arc<Metrics>>) -> Self {
        Self { counter, metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
        if let Some(ref m) = self.metrics {
            m.record_connection_closed();
        }
    }
}
