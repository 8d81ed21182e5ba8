use std::fmt;

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::error::{GateError, Result};

/// External request for a graceful stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// SIGINT/SIGTERM handlers registered with the OS.
///
/// Registration happens up front so a failure is reported at startup, not
/// when the first signal is expected.
pub struct OsSignals {
    sigint: Signal,
    sigterm: Signal,
}

impl OsSignals {
    pub fn register() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| GateError::Signal(format!("Failed to setup SIGTERM handler: {e}")))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| GateError::Signal(format!("Failed to setup SIGINT handler: {e}")))?;
        Ok(Self { sigint, sigterm })
    }

    /// Wait for the first SIGINT or SIGTERM.
    pub async fn recv(mut self) -> ShutdownSignal {
        tokio::select! {
            Some(()) = self.sigint.recv() => ShutdownSignal::Interrupt,
            Some(()) = self.sigterm.recv() => ShutdownSignal::Terminate,
            else => std::future::pending().await,
        }
    }
}
