use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming;
use hyper::header::{HeaderValue, VARY};
use hyper::{Request, Response, StatusCode};
use tracing::debug;

use crate::auth::{authenticate, AuthStore};
use crate::security::cors::apply_cors_headers;
use crate::security::{AdmissionControl, CorsPolicy};
use crate::server::handler::Handler;
use crate::server::response::{empty_response, RespBody};
use crate::telemetry::Metrics;

use super::rate_limit::check_rate_limit;
use super::recover::recover_panic;

/// The fixed middleware chain every request passes through:
/// metrics, panic recovery, CORS, rate limiting, authentication, handler.
pub struct Pipeline<H, A> {
    handler: H,
    auth: Arc<A>,
    admission: AdmissionControl,
    cors: CorsPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl<H: Handler, A: AuthStore> Pipeline<H, A> {
    pub fn new(
        handler: H,
        auth: Arc<A>,
        admission: AdmissionControl,
        cors: CorsPolicy,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            handler,
            auth,
            admission,
            cors,
            metrics,
        }
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// Serve one request from `peer`.
    pub async fn serve(
        self: Arc<Self>,
        req: Request<Incoming>,
        peer: SocketAddr,
    ) -> Response<RespBody> {
        let start = Instant::now();
        let method = req.method().clone();
        if let Some(ref m) = self.metrics {
            m.record_request_received();
        }

        let metrics = self.metrics.clone();
        let this = Arc::clone(&self);
        let resp =
            recover_panic(async move { this.dispatch(req, peer).await }, metrics.as_ref()).await;

        if let Some(ref m) = metrics {
            m.record_response_sent(
                method.as_str(),
                resp.status().as_u16(),
                start.elapsed().as_secs_f64(),
            );
        }
        resp
    }

    async fn dispatch(&self, mut req: Request<Incoming>, peer: SocketAddr) -> Response<RespBody> {
        let cors = self.cors.evaluate(req.method(), req.headers());
        if cors.preflight {
            let mut resp = empty_response(StatusCode::OK);
            apply_cors_headers(resp.headers_mut(), cors);
            return resp;
        }

        if let Some(mut resp) =
            check_rate_limit(&self.admission, peer, req.headers(), self.metrics.as_ref())
        {
            debug!(%peer, "request rejected by rate limiter");
            apply_cors_headers(resp.headers_mut(), cors);
            return resp;
        }

        let mut resp = match authenticate(self.auth.as_ref(), req.headers()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
                self.handler.handle(req).await
            }
            Err(e) => {
                if let Some(ref m) = self.metrics {
                    m.record_error(e.error_type());
                }
                e.into_response()
            }
        };

        resp.headers_mut()
            .append(VARY, HeaderValue::from_static("Authorization"));
        apply_cors_headers(resp.headers_mut(), cors);
        resp
    }
}
