use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the gateway
#[derive(Error, Debug)]
pub enum GateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Returned by `HttpServer::serve` after a deliberate stop.
    #[error("Server closed")]
    ServerClosed,

    #[error("Graceful shutdown did not finish within {grace:?}")]
    ShutdownTimeout { grace: Duration },

    /// The server stopped without a result from the shutdown coordinator,
    /// either because the coordinator died or because the listener was
    /// stopped directly.
    #[error("Server stopped without a shutdown result")]
    ShutdownAborted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Signal handler error: {0}")]
    Signal(String),
}

pub type Result<T> = std::result::Result<T, GateError>;
