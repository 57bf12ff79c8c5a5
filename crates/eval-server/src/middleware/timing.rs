//! Request timing middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// Requests slower than this are logged at warn level.
pub const SLOW_REQUEST: Duration = Duration::from_millis(100);

/// Log method, path, status and duration of each request. Cache misses that
/// wait on the engine usually land above [`SLOW_REQUEST`].
pub async fn timing_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if elapsed > SLOW_REQUEST {
        tracing::warn!(%method, %path, status, duration_ms = elapsed.as_millis() as u64, "Slow request");
    } else {
        tracing::debug!(%method, %path, status, duration_ms = elapsed.as_millis() as u64, "Request completed");
    }

    response
}
