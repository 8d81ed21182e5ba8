use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::auth::AuthStore;
use crate::error::{GateError, Result};
use crate::lifecycle::GracefulStop;
use crate::server::connection::{ConnectionGuard, ConnectionManager};
use crate::server::handler::Handler;
use crate::server::middleware::Pipeline;
use crate::telemetry::Metrics;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Listener-level knobs.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub max_connections: usize,
    pub read_header_timeout: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_connections: config.security.max_connections,
            read_header_timeout: Duration::from_secs(config.timeout.read_header_secs),
        }
    }
}

struct HandleInner {
    closing: CancellationToken,
    force_close: CancellationToken,
    connections: TaskTracker,
    local_addr: watch::Sender<Option<SocketAddr>>,
}

/// Cloneable control surface for a running [`HttpServer`].
#[derive(Clone)]
pub struct ServerHandle {
    inner: Arc<HandleInner>,
}

impl ServerHandle {
    fn new() -> Self {
        let (local_addr, _) = watch::channel(None);
        Self {
            inner: Arc::new(HandleInner {
                closing: CancellationToken::new(),
                force_close: CancellationToken::new(),
                connections: TaskTracker::new(),
                local_addr,
            }),
        }
    }

    /// The bound address, once `serve` has bound the socket.
    ///
    /// Returns `None` if the server was stopped (or failed to bind) first.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut rx = self.inner.local_addr.subscribe();
        tokio::select! {
            res = rx.wait_for(Option::is_some) => res.ok().and_then(|addr| *addr),
            _ = self.inner.closing.cancelled() => *self.inner.local_addr.borrow(),
        }
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.is_cancelled()
    }

    /// Connections still being served.
    pub fn active_connections(&self) -> usize {
        self.inner.connections.len()
    }
}

impl GracefulStop for ServerHandle {
    async fn stop(&self, grace: Duration) -> Result<()> {
        self.inner.closing.cancel();
        self.inner.connections.close();

        let pending = self.inner.connections.len();
        if pending > 0 {
            info!(pending, "waiting for in-flight connections");
        }

        if tokio::time::timeout(grace, self.inner.connections.wait())
            .await
            .is_ok()
        {
            return Ok(());
        }

        warn!(
            remaining = self.inner.connections.len(),
            grace_secs = grace.as_secs_f64(),
            "grace period elapsed, closing remaining connections"
        );
        self.inner.force_close.cancel();
        self.inner.connections.wait().await;
        Err(GateError::ShutdownTimeout { grace })
    }
}

/// HTTP/1 and HTTP/2 listener serving a [`Pipeline`].
pub struct HttpServer<H, A> {
    addr: SocketAddr,
    pipeline: Arc<Pipeline<H, A>>,
    options: ServerOptions,
    connections: Arc<ConnectionManager>,
    handle: ServerHandle,
}

impl<H: Handler, A: AuthStore> HttpServer<H, A> {
    pub fn new(
        addr: SocketAddr,
        pipeline: Arc<Pipeline<H, A>>,
        options: ServerOptions,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let handle = ServerHandle::new();
        let connections = Arc::new(ConnectionManager::new(
            options.max_connections,
            handle.inner.closing.clone(),
            metrics,
        ));
        Self {
            addr,
            pipeline,
            options,
            connections,
            handle,
        }
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Bind and accept until stopped.
    ///
    /// Never returns `Ok`: a deliberate stop yields [`GateError::ServerClosed`],
    /// anything else is a real failure.
    pub async fn serve(&self) -> Result<()> {
        let inner = &self.handle.inner;
        if inner.closing.is_cancelled() {
            return Err(GateError::ServerClosed);
        }

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| GateError::Bind {
                addr: self.addr,
                source,
            })?;
        let local = listener.local_addr()?;
        inner.local_addr.send_replace(Some(local));
        debug!(addr = %local, "listener bound");

        let mut builder = ConnBuilder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.options.read_header_timeout);

        loop {
            tokio::select! {
                _ = inner.closing.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "accept error");
                            sleep(ACCEPT_ERROR_BACKOFF).await;
                            continue;
                        }
                    };

                    let guard = match self.connections.try_accept(peer) {
                        Ok(guard) => guard,
                        Err(e) => {
                            debug!(%peer, error = %e, "connection rejected");
                            drop(stream);
                            continue;
                        }
                    };

                    let conn = ConnectionTask {
                        stream,
                        peer,
                        builder: builder.clone(),
                        pipeline: Arc::clone(&self.pipeline),
                        closing: inner.closing.clone(),
                        force_close: inner.force_close.clone(),
                        _guard: guard,
                    };
                    inner.connections.spawn(conn.run());
                }
            }
        }

        drop(listener);
        debug!("listener closed");
        Err(GateError::ServerClosed)
    }
}

struct ConnectionTask<H, A> {
    stream: TcpStream,
    peer: SocketAddr,
    builder: ConnBuilder<TokioExecutor>,
    pipeline: Arc<Pipeline<H, A>>,
    closing: CancellationToken,
    force_close: CancellationToken,
    _guard: ConnectionGuard,
}

impl<H: Handler, A: AuthStore> ConnectionTask<H, A> {
    async fn run(self) {
        let peer = self.peer;
        let pipeline = self.pipeline;
        let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
            let pipeline = Arc::clone(&pipeline);
            async move { Ok::<_, hyper::Error>(pipeline.serve(req, peer).await) }
        });

        let conn = self.builder.serve_connection(TokioIo::new(self.stream), svc);
        tokio::pin!(conn);

        let finished = tokio::select! {
            res = conn.as_mut() => Some(res),
            _ = self.closing.cancelled() => None,
        };

        let res = match finished {
            Some(res) => res,
            None => {
                // Finish in-flight requests, refuse new ones on this connection.
                conn.as_mut().graceful_shutdown();
                tokio::select! {
                    res = conn.as_mut() => res,
                    _ = self.force_close.cancelled() => {
                        debug!(%peer, "connection closed after grace period");
                        return;
                    }
                }
            }
        };

        if let Err(e) = res {
            debug!(%peer, error = %e, "serve_connection error");
        }
    }
}
