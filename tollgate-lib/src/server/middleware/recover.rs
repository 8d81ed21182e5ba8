use std::future::Future;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONNECTION};
use hyper::Response;
use tokio_util::task::AbortOnDropHandle;
use tracing::error;

use crate::server::http_result::HttpError;
use crate::server::response::RespBody;
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Run `fut` on its own task and turn a panic into a 500.
///
/// The response asks the client to close the connection since the handler
/// state that panicked may be inconsistent. Dropping the returned future (the
/// connection went away or was force closed) aborts the handler task.
pub async fn recover_panic<F>(fut: F, metrics: Option<&Arc<Metrics>>) -> Response<RespBody>
where
    F: Future<Output = Response<RespBody>> + Send + 'static,
{
    match AbortOnDropHandle::new(tokio::spawn(fut)).await {
        Ok(resp) => resp,
        Err(e) => {
            if e.is_panic() {
                error!(error = %e, "request handler panicked");
            } else {
                error!(error = %e, "request handler task was cancelled");
            }
            if let Some(m) = metrics {
                m.record_error(values::ERROR_PANIC);
            }
            let mut resp =
                HttpError::Internal("request handler panicked".to_string()).into_response();
            resp.headers_mut()
                .insert(CONNECTION, HeaderValue::from_static("close"));
            resp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::response::empty_response;
    use http::StatusCode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn panic_becomes_500_with_connection_close() {
        let resp = recover_panic(
            async {
                if StatusCode::OK.is_success() {
                    panic!("boom");
                }
                empty_response(StatusCode::OK)
            },
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get(CONNECTION), Some(&HeaderValue::from_static("close")));
    }

    #[tokio::test]
    async fn dropping_the_request_aborts_the_handler() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let handler = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
            empty_response(StatusCode::OK)
        };

        let cut =
            tokio::time::timeout(Duration::from_millis(20), recover_panic(handler, None)).await;
        assert!(cut.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn normal_response_passes_through() {
        let resp = recover_panic(async { empty_response(StatusCode::NO_CONTENT) }, None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
