//! Prometheus metrics.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    describe_counter!("capgen_http_requests_total", "Total HTTP requests by method and status");
    describe_histogram!("capgen_http_request_duration_ms", "Request latency in milliseconds");
    describe_counter!("capgen_jobs_enqueued_total", "Jobs submitted to the generation queue");
    describe_counter!("capgen_rate_limit_hits_total", "Requests rejected by the rate limiter");

    handle
}

/// Request counting middleware.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!("capgen_http_requests_total", "method" => method, "status" => status).increment(1);
    histogram!("capgen_http_request_duration_ms").record(start.elapsed().as_millis() as f64);

    response
}

/// Record a job enqueue.
pub fn record_job_enqueued(file_type: &str) {
    counter!("capgen_jobs_enqueued_total", "file_type" => file_type.to_string()).increment(1);
}

/// Record a rate limiter rejection.
pub fn record_rate_limit_hit(path: &str) {
    counter!("capgen_rate_limit_hits_total", "path" => path.to_string()).increment(1);
}
