//! API routes for the RAG server

pub mod ask;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::post,
    Router,
};
use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build the ingestion and question answering routes
pub fn pipeline_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Larger body limit for manual uploads
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask_question))
}

/// Turn an extractor rejection into a JSON error response
pub(crate) fn rejected(status: StatusCode, message: String) -> Error {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(message)
    } else {
        Error::BadRequest(message)
    }
}

/// Run a request's pipeline work under the configured time limit
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, work).await.map_err(|_| {
        Error::Timeout(format!(
            "{} did not finish within {}ms",
            what,
            limit.as_millis()
        ))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_is_kept() {
        let err = rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".into());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = rejected(StatusCode::UNSUPPORTED_MEDIA_TYPE, "not multipart".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "not multipart");
    }

    #[tokio::test]
    async fn test_slow_work_times_out() {
        let err = with_timeout(Duration::from_millis(10), "Slow work", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(ref m) if m.contains("10ms")));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
