use axum::{body::Body, http::Request, middleware::Next, response::Response};
use crate::error::ErrorDetail;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Log every non-2xx/3xx outcome with its latency
pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();
    let started = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let detail = response
        .extensions()
        .get::<ErrorDetail>()
        .map(|detail| detail.0.as_str())
        .unwrap_or_default();

    if status.is_client_error() {
        warn!(%method, %uri, %status, elapsed_ms, error = detail, "Rejected request");
    } else if status.is_server_error() {
        error!(%method, %uri, %status, elapsed_ms, error = detail, "Request failed");
    } else {
        debug!(%method, %uri, %status, elapsed_ms, "Request handled");
    }

    response
}
