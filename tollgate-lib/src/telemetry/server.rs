use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{GateError, Result};
use crate::server::response::error_response;
use crate::telemetry::{handle_metrics, health_check_response};

/// Start the observability server that handles metrics and health checks
/// This server runs on a dedicated port and serves:
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
///
/// It stops accepting when `shutdown` fires.
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    env: String,
    shutdown: CancellationToken,
) -> Result<()> {
    let registry = Arc::new(registry);
    let env: Arc<str> = Arc::from(env);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GateError::Bind { addr, source })?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let env = env.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let env = env.clone();
                        async move {
                            let resp = match req.uri().path() {
                                "/health" => health_check_response(&env),
                                "/metrics" => handle_metrics(&registry).unwrap_or_else(|e| {
                                    warn!(error = %e, "metrics rendering failed");
                                    error_response(
                                        StatusCode::INTERNAL_SERVER_ERROR,
                                        "metrics unavailable",
                                    )
                                }),
                                _ => error_response(StatusCode::NOT_FOUND, "not found"),
                            };
                            Ok::<_, hyper::Error>(resp)
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}
