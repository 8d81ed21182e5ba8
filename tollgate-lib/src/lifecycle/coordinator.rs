use std::future::Future;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::barrier::BackgroundWork;
use super::signal::ShutdownSignal;
use crate::error::{GateError, Result};

/// A listener that can be told to stop accepting and drain its connections.
pub trait GracefulStop: Send + Sync + 'static {
    /// Stop accepting, wait up to `grace` for in-flight requests, then close
    /// whatever is left. Makes the listener's serve call return
    /// [`GateError::ServerClosed`].
    fn stop(&self, grace: Duration) -> impl Future<Output = Result<()>> + Send;
}

/// Progress of a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Stopping(ShutdownSignal),
    Drained,
    Clean,
    Failed,
}

/// Final outcome, published exactly once.
#[derive(Debug)]
pub enum ShutdownResult {
    Clean,
    Failed(GateError),
}

impl ShutdownResult {
    pub fn is_clean(&self) -> bool {
        matches!(self, ShutdownResult::Clean)
    }
}

/// Receiving side of the one-shot result handoff.
#[derive(Debug)]
pub struct ShutdownOutcome {
    rx: oneshot::Receiver<ShutdownResult>,
}

impl ShutdownOutcome {
    /// Wait for the published result.
    ///
    /// `None` if the coordinator was dropped without publishing.
    pub async fn recv(self) -> Option<ShutdownResult> {
        self.rx.await.ok()
    }
}

/// Drives `Running → Stopping → Drained → {Clean, Failed}`.
///
/// The trigger is any future resolving to a [`ShutdownSignal`], so the drain
/// sequence can run without OS signals. Owning the oneshot sender by value
/// makes a second publish impossible.
pub struct ShutdownCoordinator<L> {
    listener: L,
    background: BackgroundWork,
    grace: Duration,
    state: watch::Sender<ShutdownState>,
    result: oneshot::Sender<ShutdownResult>,
}

impl<L: GracefulStop> ShutdownCoordinator<L> {
    pub fn new(
        listener: L,
        background: BackgroundWork,
        grace: Duration,
    ) -> (Self, ShutdownOutcome) {
        let (result, rx) = oneshot::channel();
        let (state, _) = watch::channel(ShutdownState::Running);
        let coordinator = Self {
            listener,
            background,
            grace,
            state,
            result,
        };
        (coordinator, ShutdownOutcome { rx })
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Wait for `trigger`, then stop the listener, drain background work and
    /// publish the result.
    pub async fn run<F>(self, trigger: F)
    where
        F: Future<Output = ShutdownSignal>,
    {
        let signal = trigger.await;
        self.state.send_replace(ShutdownState::Stopping(signal));
        info!(%signal, grace_secs = self.grace.as_secs_f64(), "shutting down server");

        // A failed stop is reported in the result; draining still happens.
        let stopped = self.listener.stop(self.grace).await;
        if let Err(ref e) = stopped {
            warn!(error = %e, "listener stop reported an error, continuing drain");
        }

        info!(pending = self.background.len(), "completing background tasks");
        self.background.wait().await;
        self.state.send_replace(ShutdownState::Drained);

        let (state, result) = match stopped {
            Ok(()) => (ShutdownState::Clean, ShutdownResult::Clean),
            Err(e) => (ShutdownState::Failed, ShutdownResult::Failed(e)),
        };
        self.state.send_replace(state);

        if self.result.send(result).is_err() {
            debug!("shutdown result receiver dropped before publish");
        }
    }
}
