use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use hyper::Response;
use thiserror::Error;

use super::response::{error_response, RespBody};

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate an error response
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes request-level failures surfaced to clients
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid or missing authentication token")]
    InvalidCredentials,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("the server encountered a problem and could not process your request")]
    Internal(String),
}

impl HttpError {
    /// Label used for the errors metric
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpError::InvalidCredentials => "invalid_credentials",
            HttpError::AuthenticationRequired => "authentication_required",
            HttpError::InactiveAccount => "inactive_account",
            HttpError::NotPermitted => "not_permitted",
            HttpError::NotFound => "not_found",
            HttpError::MethodNotAllowed(_) => "method_not_allowed",
            HttpError::RateLimitExceeded => "rate_limited",
            HttpError::Internal(_) => "internal",
        }
    }

    /// Render the error as a JSON error response.
    ///
    /// Internal details are logged, never sent to the client.
    pub fn into_response(self) -> Response<RespBody> {
        if let HttpError::Internal(ref detail) = self {
            tracing::error!(error = %detail, "request failed");
        }

        let status = StatusCode::from(self.clone());
        let mut resp = error_response(status, &self.to_string());
        if self == HttpError::InvalidCredentials {
            resp.headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        match e {
            HttpError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            HttpError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            HttpError::InactiveAccount => StatusCode::FORBIDDEN,
            HttpError::NotPermitted => StatusCode::FORBIDDEN,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
