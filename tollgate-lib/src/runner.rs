use std::future::Future;
use std::sync::Arc;

use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::auth::AuthStore;
use crate::config::Config;
use crate::error::{GateError, Result};
use crate::lifecycle::{
    BackgroundWork, OsSignals, ShutdownCoordinator, ShutdownResult, ShutdownSignal, ShutdownState,
};
use crate::security::{AdmissionControl, BucketParams, ClientLimiterTable, CorsPolicy, Sweeper};
use crate::server::{Handler, HttpServer, Pipeline, ServerHandle, ServerOptions};
use crate::telemetry::{start_observability_server, Metrics};

/// Wires the listener, the middleware pipeline, the rate limit sweeper and the
/// shutdown coordinator together and runs them until shutdown.
pub struct ServerRunner<H, A> {
    config: Arc<Config>,
    server: HttpServer<H, A>,
    table: Arc<ClientLimiterTable>,
    background: BackgroundWork,
    registry: Option<Registry>,
}

impl<H: Handler, A: AuthStore> ServerRunner<H, A> {
    pub fn new(
        config: Arc<Config>,
        handler: H,
        auth: Arc<A>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let rate_limit = &config.security.rate_limit;
        let table = Arc::new(ClientLimiterTable::new(BucketParams::from(rate_limit)));
        let admission = AdmissionControl::from_config(rate_limit, Arc::clone(&table));
        let cors = CorsPolicy::from_config(&config.security.cors);

        let pipeline = Arc::new(Pipeline::new(handler, auth, admission, cors, metrics.clone()));
        let options = ServerOptions::from_config(&config);
        let server = HttpServer::new(config.listen, pipeline, options, metrics);

        Self {
            config,
            server,
            table,
            background: BackgroundWork::new(),
            registry: None,
        }
    }

    /// Share a barrier with handlers that spawn background work.
    pub fn with_background_work(mut self, background: BackgroundWork) -> Self {
        self.background = background;
        self
    }

    /// Serve `/metrics` and `/health` from `registry` on `telemetry.metrics_port`.
    pub fn with_observability(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn handle(&self) -> ServerHandle {
        self.server.handle()
    }

    pub fn background(&self) -> BackgroundWork {
        self.background.clone()
    }

    pub fn table(&self) -> &Arc<ClientLimiterTable> {
        &self.table
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let signals = OsSignals::register()?;
        self.run_until(signals.recv()).await
    }

    /// Run until `trigger` resolves, then shut down gracefully.
    ///
    /// Returns `Ok(())` only after a clean shutdown. A listener failure other
    /// than the deliberate close is returned right away without waiting for
    /// the coordinator. So is a close that did not come from the coordinator
    /// (someone called `stop` on [`ServerRunner::handle`]): there is no result
    /// to wait for, and `GateError::ShutdownAborted` is returned.
    pub async fn run_until<F>(self, trigger: F) -> Result<()>
    where
        F: Future<Output = ShutdownSignal> + Send + 'static,
    {
        let config = Arc::clone(&self.config);
        let aux = CancellationToken::new();

        let sweeper = if config.security.rate_limit.enabled {
            let sweeper = Sweeper::new(
                Arc::clone(&self.table),
                config.sweep_interval(),
                config.stale_threshold(),
            );
            Some(sweeper.spawn(aux.child_token()))
        } else {
            None
        };

        if let (Some(registry), Some(port)) = (self.registry, config.telemetry.metrics_port) {
            let env = config.env.clone();
            let shutdown = aux.child_token();
            tokio::spawn(async move {
                if let Err(e) = start_observability_server(port, registry, env, shutdown).await {
                    error!(error = %e, "observability server failed");
                }
            });
        }

        let (coordinator, outcome) = ShutdownCoordinator::new(
            self.server.handle(),
            self.background.clone(),
            config.shutdown_grace(),
        );
        let state = coordinator.state();
        let coordinator = tokio::spawn(coordinator.run(trigger));

        info!(addr = %config.listen, env = %config.env, "starting server");

        let served = self.server.serve().await;
        // The coordinator leaves Running before it stops the listener.
        let coordinated = *state.borrow() != ShutdownState::Running;

        let result = match served {
            Ok(()) | Err(GateError::ServerClosed) if !coordinated => {
                warn!("listener was stopped outside the shutdown coordinator");
                coordinator.abort();
                Err(GateError::ShutdownAborted)
            }
            Ok(()) | Err(GateError::ServerClosed) => match outcome.recv().await {
                Some(ShutdownResult::Clean) => {
                    info!(addr = %config.listen, "stopped server");
                    Ok(())
                }
                Some(ShutdownResult::Failed(e)) => Err(e),
                None => Err(GateError::ShutdownAborted),
            },
            Err(e) => {
                coordinator.abort();
                Err(e)
            }
        };

        aux.cancel();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        result
    }
}
