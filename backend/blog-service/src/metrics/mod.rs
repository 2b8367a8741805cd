//! Prometheus metrics for blog-service.
//!
//! Collectors are registered in the default registry and rendered by the
//! `/metrics` HTTP handler.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// gRPC requests by full method path and gRPC status code.
    pub static ref GRPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_grpc_requests_total",
        "Total gRPC requests segmented by method and status code",
        &["method", "code"]
    )
    .expect("failed to register blog_grpc_requests_total");

    /// gRPC request latency by full method path.
    pub static ref GRPC_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "blog_grpc_request_duration_seconds",
        "gRPC request duration segmented by method",
        &["method"]
    )
    .expect("failed to register blog_grpc_request_duration_seconds");

    /// Store operations by name and outcome (ok / not_found).
    pub static ref POST_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_post_operations_total",
        "Post store operations segmented by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("failed to register blog_post_operations_total");

    /// Post events that could not be handed to the event channel.
    pub static ref EVENTS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_events_dropped_total",
        "Post events dropped before reaching the event logger",
        &["reason"]
    )
    .expect("failed to register blog_events_dropped_total");

    /// Number of posts currently held in memory.
    pub static ref POSTS_STORED: IntGauge = register_int_gauge!(
        "blog_posts_stored",
        "Number of posts currently held by the store"
    )
    .expect("failed to register blog_posts_stored");
}

/// Record the outcome of one adapter call.
pub fn record_operation(operation: &str, outcome: &str) {
    POST_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operation_increments_counter() {
        let before = POST_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test", "ok"])
            .get();
        record_operation("metrics_test", "ok");
        let after = POST_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test", "ok"])
            .get();

        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn test_serve_metrics_renders_text_format() {
        record_operation("metrics_render_test", "ok");

        let response = serve_metrics().await;
        assert!(response.status().is_success());
    }
}
