use std::future::Future;

use hyper::body::Incoming;
use hyper::{Request, Response};

use super::response::RespBody;

/// The downstream request handler wrapped by the middleware pipeline.
///
/// Routing and the business API live behind this trait; the pipeline never
/// inspects response bodies.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request<Incoming>) -> impl Future<Output = Response<RespBody>> + Send;
}

/// Adapter returned by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Create a [`Handler`] from an async closure.
///
/// # Example
/// ```ignore
/// let handler = handler_fn(|_req| async { empty_response(StatusCode::NO_CONTENT) });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Incoming>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<RespBody>> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Incoming>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<RespBody>> + Send + 'static,
{
    fn handle(&self, req: Request<Incoming>) -> impl Future<Output = Response<RespBody>> + Send {
        (self.f)(req)
    }
}
