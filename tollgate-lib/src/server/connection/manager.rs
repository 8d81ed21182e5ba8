use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

use super::guards::ConnectionGuard;

/// Errors that can occur when trying to accept a connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Server is shutting down")]
    Shutdown,
    #[error("Connection limit exceeded (current: {current}, limit: {limit})")]
    LimitExceeded { current: usize, limit: usize },
}

/// Manages connection limits and lifecycle
pub struct ConnectionManager {
    active_connections: Arc<AtomicUsize>,
    max_connections: usize,
    closing: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionManager {
    pub fn new(
        max_connections: usize,
        closing: CancellationToken,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            active_connections: Arc::new(AtomicUsize::new(0)),
            max_connections,
            closing,
            metrics,
        }
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.closing.is_cancelled()
    }

    /// Try to accept a new connection
    /// Returns Ok(guard) if connection is accepted, Err(ConnectionError) if rejected
    pub fn try_accept(&self, peer: SocketAddr) -> Result<ConnectionGuard, ConnectionError> {
        if self.is_shutdown() {
            if let Some(ref m) = self.metrics {
                m.record_connection_rejected(values::REASON_SHUTDOWN);
            }
            return Err(ConnectionError::Shutdown);
        }

        let current_connections = self.active_connections.load(Ordering::Relaxed);
        if current_connections >= self.max_connections {
            if let Some(ref m) = self.metrics {
                m.record_connection_rejected(values::REASON_CONNECTION_LIMIT);
            }
            warn!(
                current = current_connections,
                limit = self.max_connections,
                peer = %peer,
                "Connection limit exceeded, rejecting connection"
            );
            return Err(ConnectionError::LimitExceeded {
                current: current_connections,
                limit: self.max_connections,
            });
        }

        self.active_connections.fetch_add(1, Ordering::Relaxed);

        if let Some(ref m) = self.metrics {
            m.record_connection_opened();
        }

        Ok(ConnectionGuard::new(self.active_connections.clone(), self.metrics.clone()))
    }
}
