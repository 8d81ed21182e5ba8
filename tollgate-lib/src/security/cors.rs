use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use http::{HeaderMap, HeaderValue, Method};

use crate::config::CorsConfig;

const ALLOWED_METHODS: &str = "OPTIONS, PUT, PATCH, DELETE, GET";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Headers to add to the response, and whether the request was a preflight
/// that must be answered without calling downstream.
#[derive(Debug, Default)]
pub struct CorsOutcome {
    pub headers: HeaderMap,
    pub preflight: bool,
}

/// Credentialed CORS for a fixed list of trusted origins.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    trusted_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(trusted_origins: Vec<String>) -> Self {
        Self { trusted_origins }
    }

    pub fn from_config(cfg: &CorsConfig) -> Self {
        Self::new(cfg.trusted_origins.clone())
    }

    pub fn is_trusted(&self, origin: &str) -> bool {
        self.trusted_origins.iter().any(|o| o == origin)
    }

    /// Evaluate a request.
    ///
    /// `Vary` and `Access-Control-Allow-Credentials` are set on every response,
    /// trusted origin or not.
    pub fn evaluate(&self, method: &Method, request_headers: &HeaderMap) -> CorsOutcome {
        let mut outcome = CorsOutcome::default();
        outcome.headers.append(VARY, HeaderValue::from_static("Origin"));
        outcome.headers.append(VARY, HeaderValue::from_static("Access-Control-Request-Method"));
        outcome
            .headers
            .insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));

        let Some(origin) = request_headers.get(ORIGIN) else {
            return outcome;
        };
        let trusted = origin.to_str().map(|o| self.is_trusted(o)).unwrap_or(false);
        if !trusted {
            return outcome;
        }

        outcome.headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());

        if *method == Method::OPTIONS && request_headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
        {
            outcome
                .headers
                .insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
            outcome
                .headers
                .insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
            outcome.preflight = true;
        }

        outcome
    }
}

/// Append the CORS headers of `outcome` to a response header map.
pub fn apply_cors_headers(response_headers: &mut HeaderMap, outcome: CorsOutcome) {
    for (name, value) in outcome.headers.iter() {
        if *name == VARY {
            response_headers.append(name.clone(), value.clone());
        } else {
            response_headers.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(vec!["https://app.example.com".to_string()])
    }

    #[test]
    fn untrusted_origin_gets_no_allow_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://evil.example.com"));
        let outcome = policy().evaluate(&Method::GET, &headers);
        assert!(!outcome.preflight);
        assert!(outcome.headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(outcome.headers.get_all(VARY).iter().count(), 2);
    }

    #[test]
    fn trusted_origin_is_echoed() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
        let outcome = policy().evaluate(&Method::GET, &headers);
        assert!(!outcome.preflight);
        assert_eq!(
            outcome.headers.get(ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://app.example.com"))
        );
    }

    #[test]
    fn trusted_preflight_short_circuits() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
        headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("DELETE"));
        let outcome = policy().evaluate(&Method::OPTIONS, &headers);
        assert!(outcome.preflight);
        assert_eq!(
            outcome.headers.get(ACCESS_CONTROL_ALLOW_METHODS),
            Some(&HeaderValue::from_static(ALLOWED_METHODS))
        );
    }

    #[test]
    fn plain_options_is_not_preflight() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
        assert!(!policy().evaluate(&Method::OPTIONS, &headers).preflight);
    }
}
