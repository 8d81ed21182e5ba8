#![forbid(unsafe_code)]

use clap::Parser;
use http::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tollgate_lib::auth::{
    current_user, require_activated_user, MemoryAuthStore, TokenScope, User, TOKEN_LENGTH,
};
use tollgate_lib::config::{load_from_path, Config};
use tollgate_lib::server::{json_response, HttpError, RespBody};
use tollgate_lib::telemetry::{init_metrics, init_tracing};
use tollgate_lib::{handler_fn, ServerRunner};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rate limited, gracefully stopping HTTP front door")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "config/tollgate.toml")]
    config: PathBuf,

    /// Seed an activated demo user reachable with this 26 character token
    #[arg(long, env = "TOLLGATE_DEMO_TOKEN")]
    demo_token: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_from_path(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            let defaults = Config::default();
            let _ = init_tracing(&defaults.logging, &defaults.telemetry);
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&config.logging, &config.telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(listen = %config.listen, env = %config.env, "configuration loaded");

    if let Err(err) = run(Arc::new(config), cli.demo_token).await {
        error!(%err, "server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: Arc<Config>, demo_token: Option<String>) -> tollgate_lib::Result<()> {
    let store = Arc::new(MemoryAuthStore::new());
    if let Some(token) = demo_token {
        if token.len() != TOKEN_LENGTH {
            warn!(
                expected = TOKEN_LENGTH,
                "demo token has the wrong length and will never authenticate"
            );
        }
        store.insert_user(User {
            id: 1,
            name: "Demo".to_string(),
            email: "demo@example.com".to_string(),
            activated: true,
        });
        store.insert_token(TokenScope::Authentication, &token, 1);
    }

    let metrics = match config.telemetry.metrics_port {
        Some(_) => match init_metrics() {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!(%err, "failed to initialize metrics, continuing without");
                None
            }
        },
        None => None,
    };

    let env = config.env.clone();
    let handler = handler_fn(move |req| route(req, env.clone()));

    let runner = match metrics {
        Some((metrics, registry)) => {
            ServerRunner::new(Arc::clone(&config), handler, store, Some(metrics))
                .with_observability(registry)
        }
        None => ServerRunner::new(Arc::clone(&config), handler, store, None),
    };

    runner.run().await
}

async fn route<B>(req: Request<B>, env: String) -> Response<RespBody> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/v1/healthcheck") => json_response(
            StatusCode::OK,
            &json!({
                "status": "available",
                "system_info": {
                    "environment": env,
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        (&Method::GET, "/v1/me") => {
            let user = current_user(&req);
            match require_activated_user(&user) {
                Ok(user) => json_response(StatusCode::OK, &json!({ "user": user })),
                Err(e) => e.into_response(),
            }
        }
        (_, "/v1/healthcheck" | "/v1/me") => {
            HttpError::MethodNotAllowed(req.method().to_string()).into_response()
        }
        _ => HttpError::NotFound.into_response(),
    }
}
