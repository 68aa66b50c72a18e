//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use vision_models::VideoSummary;

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric name constants.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vision_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vision_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vision_http_requests_in_flight";

    // Summary metrics
    pub const SUMMARIES_TOTAL: &str = "vision_summaries_total";
    pub const SUMMARY_OCCURRENCES_TOTAL: &str = "vision_summary_occurrences_total";

    // Attachment metrics
    pub const ATTACHMENT_BYTES_SERVED_TOTAL: &str = "vision_attachment_bytes_served_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vision_rate_limit_hits_total";
}

/// Label for requests that matched no route (static files, 404s).
const UNMATCHED_PATH: &str = "unmatched";

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a computed summary and what it retained.
pub fn record_summary(summary: &VideoSummary) {
    counter!(names::SUMMARIES_TOTAL).increment(1);
    counter!(names::SUMMARY_OCCURRENCES_TOTAL, "category" => "face_detection")
        .increment(summary.face_detection.len() as u64);
    counter!(names::SUMMARY_OCCURRENCES_TOTAL, "category" => "image_keywords")
        .increment(summary.image_keywords.len() as u64);
}

/// Record bytes of an attachment sent to a client.
pub fn record_attachment_served(kind: &str, bytes: usize) {
    counter!(names::ATTACHMENT_BYTES_SERVED_TOTAL, "kind" => kind.to_string()).increment(bytes as u64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Requests are labeled by route template so IDs never become label values.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
