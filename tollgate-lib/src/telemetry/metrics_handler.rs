use hyper::Response;
use hyper::StatusCode;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;

use crate::error::{GateError, Result};
use crate::server::response::{full_body, json_response, RespBody};

/// Render the Prometheus registry in text exposition format.
pub fn handle_metrics(registry: &prometheus::Registry) -> Result<Response<RespBody>> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| GateError::Http(format!("Failed to encode metrics: {e}")))?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(full_body(buffer))
        .map_err(|e| GateError::Http(format!("Failed to build response: {e}")))?;

    Ok(response)
}

/// Health check response - always returns 200 if process is running
pub fn health_check_response(env: &str) -> Response<RespBody> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "available",
            "system_info": {
                "environment": env,
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}
