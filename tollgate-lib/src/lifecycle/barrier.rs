use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::error;

/// Background work the process must finish before it exits.
///
/// Every tracked task holds a token that is released when the task ends, on
/// every exit path including panics, so [`BackgroundWork::wait`] cannot hang
/// on a task that crashed. The wait has no timeout: tracked work is never
/// dropped, at the cost of shutdown blocking on a task that never ends.
#[derive(Clone, Default)]
pub struct BackgroundWork {
    tracker: TaskTracker,
}

/// Held while a unit of tracked work is in progress.
pub struct WorkGuard {
    _token: TaskTrackerToken,
}

impl BackgroundWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` as tracked background work.
    ///
    /// A panic inside `fut` is logged and still releases the barrier.
    pub fn spawn<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(e) = tokio::spawn(fut).await {
                if e.is_panic() {
                    error!(task = name, "background task panicked");
                } else {
                    error!(task = name, error = %e, "background task cancelled");
                }
            }
        })
    }

    /// Track work that is not spawned through [`BackgroundWork::spawn`].
    pub fn enter(&self) -> WorkGuard {
        WorkGuard {
            _token: self.tracker.token(),
        }
    }

    /// Number of tracked tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait until every tracked task has finished.
    ///
    /// Work started while waiting is waited for as well.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
