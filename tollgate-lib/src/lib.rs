#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod runner;
pub mod security;
pub mod server;
pub mod telemetry;

pub use config::{load_from_path, Config};
pub use error::{GateError, Result};
pub use lifecycle::{BackgroundWork, ShutdownSignal};
pub use runner::ServerRunner;
pub use server::{handler_fn, Handler, HttpServer, ServerHandle};
