//! HTTP listener, middleware pipeline and response helpers.

pub mod connection;
pub mod handler;
pub mod http_result;
pub mod listener;
pub mod middleware;
pub mod response;

pub use handler::{handler_fn, Handler, HandlerFn};
pub use http_result::{HttpError, HttpResult};
pub use listener::{HttpServer, ServerHandle, ServerOptions};
pub use middleware::Pipeline;
pub use response::{empty_response, error_response, json_response, RespBody};
