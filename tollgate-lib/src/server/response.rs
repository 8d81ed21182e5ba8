use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use serde_json::json;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub fn empty_body() -> RespBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Build a response with an empty body.
pub fn empty_response(status: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status;
    resp
}

/// Build a JSON response from a serializable value.
///
/// Serialization failures degrade to a plain-text 500.
pub fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<RespBody> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut resp = Response::new(full_body(body));
            *resp.status_mut() = status;
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            let mut resp = Response::new(full_body("Internal Server Error"));
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp
        }
    }
}

/// Build the `{"error": message}` envelope used by every error response.
pub fn error_response(status: StatusCode, message: &str) -> Response<RespBody> {
    json_response(status, &json!({ "error": message }))
}
