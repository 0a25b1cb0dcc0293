//! Request completion logging
//!
//! Spans come from `TraceLayer`; this only adds one structured line per request.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{info, warn};

use super::metrics::route_path;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = route_path(&request);
    let request_id = request_id(&request);

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(method = %method, path = %path, status = status.as_u16(), duration_ms, request_id = %request_id, "Request failed");
    } else {
        info!(method = %method, path = %path, status = status.as_u16(), duration_ms, request_id = %request_id, "Request completed");
    }

    response
}

fn request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| "-".to_string())
}
