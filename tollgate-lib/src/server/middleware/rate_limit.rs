use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{HeaderName, HeaderValue, RETRY_AFTER};
use hyper::Response;

use crate::security::{Admission, AdmissionControl};
use crate::server::http_result::HttpError;
use crate::server::response::RespBody;
use crate::telemetry::Metrics;

/// Check rate limiting for incoming request.
///
/// Returns:
/// - `None` if request is allowed to proceed
/// - `Some(429 response)` if request exceeds rate limit
pub fn check_rate_limit(
    admission: &AdmissionControl,
    peer: SocketAddr,
    headers: &http::HeaderMap,
    metrics: Option<&Arc<Metrics>>,
) -> Option<Response<RespBody>> {
    match admission.check(peer, headers) {
        Admission::Bypassed => None,
        Admission::Admitted => {
            if let Some(m) = metrics {
                m.record_rate_limit_allowed();
            }
            None
        }
        Admission::Rejected { result, .. } => {
            if let Some(m) = metrics {
                m.record_rate_limit_rejection();
            }
            Some(create_429_response(result.limit(), result.reset_after().unwrap_or_default()))
        }
    }
}

fn create_429_response(limit: u32, reset_after: Duration) -> Response<RespBody> {
    let mut resp = HttpError::RateLimitExceeded.into_response();
    // round up so clients never retry before a token is back
    let retry_secs = reset_after
        .as_secs()
        .saturating_add(u64::from(reset_after.subsec_nanos() > 0));

    resp.headers_mut().insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from_str(&limit.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    resp.headers_mut().insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from_static("0"),
    );
    resp.headers_mut().insert(
        RETRY_AFTER,
        HeaderValue::from_str(&retry_secs.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("1")),
    );

    resp
}
