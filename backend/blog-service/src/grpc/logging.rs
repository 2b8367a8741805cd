//! Request logging for the gRPC transport
//!
//! A tower layer that wraps the tonic router and writes one structured log
//! record per call with the method, latency, gRPC status and request id. It
//! also feeds the request counters and latency histogram, and runs each call
//! inside a `grpc_request` span parented on the caller's trace context.

use futures::future::BoxFuture;
use opentelemetry::{global, propagation::Extractor, trace::SpanKind};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::metrics::{GRPC_REQUESTS_TOTAL, GRPC_REQUEST_DURATION_SECONDS};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Read the gRPC status code from response headers.
///
/// Errors from tonic handlers are sent as trailers-only responses, so the
/// status appears in the headers. A normal unary response carries it in the
/// trailers instead, which means "OK" here.
pub fn grpc_status_code(headers: &http::HeaderMap) -> String {
    headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("0")
        .to_string()
}

fn request_id(headers: &http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// HTTP/2 header extractor for trace context propagation
struct HeaderExtractor<'a>(&'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

fn request_span(method: &str, request_id: &str, headers: &http::HeaderMap) -> tracing::Span {
    let parent_context =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)));

    let span = tracing::info_span!(
        "grpc_request",
        otel.kind = ?SpanKind::Server,
        rpc.service = method.trim_start_matches('/').split('/').next().unwrap_or("unknown"),
        rpc.method = method.rsplit('/').next().unwrap_or("unknown"),
        request_id = %request_id,
    );
    span.set_parent(parent_context);
    span
}

/// Tower layer for gRPC request logging
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLoggingLayer;

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestLoggingService { inner: service }
    }
}

#[derive(Clone, Debug)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for RequestLoggingService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let method = req.uri().path().to_string();
        let request_id = request_id(req.headers());
        let span = request_span(&method, &request_id, req.headers());
        let start = Instant::now();
        let future = {
            let _entered = span.enter();
            self.inner.call(req)
        };

        Box::pin(async move {
            let result = future.await;
            let elapsed = start.elapsed();

            GRPC_REQUEST_DURATION_SECONDS
                .with_label_values(&[method.as_str()])
                .observe(elapsed.as_secs_f64());

            match &result {
                Ok(response) => {
                    let code = grpc_status_code(response.headers());
                    GRPC_REQUESTS_TOTAL
                        .with_label_values(&[method.as_str(), code.as_str()])
                        .inc();
                    tracing::info!(
                        method = %method,
                        latency_ms = elapsed.as_millis() as u64,
                        grpc_status = %code,
                        request_id = %request_id,
                        "grpc request"
                    );
                }
                Err(err) => {
                    GRPC_REQUESTS_TOTAL
                        .with_label_values(&[method.as_str(), "transport_error"])
                        .inc();
                    tracing::error!(
                        method = %method,
                        latency_ms = elapsed.as_millis() as u64,
                        request_id = %request_id,
                        error = %err,
                        "grpc request failed"
                    );
                }
            }

            result
        }
        .instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[test]
    fn test_grpc_status_defaults_to_ok() {
        let headers = http::HeaderMap::new();
        assert_eq!(grpc_status_code(&headers), "0");

        let mut headers = http::HeaderMap::new();
        headers.insert("grpc-status", "5".parse().expect("valid header"));
        assert_eq!(grpc_status_code(&headers), "5");
    }

    #[test]
    fn test_request_id_is_propagated_or_generated() {
        let mut headers = http::HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, "req-42".parse().expect("valid header"));
        assert_eq!(request_id(&headers), "req-42");

        let generated = request_id(&http::HeaderMap::new());
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_header_extractor_reads_traceparent() {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .expect("valid header"),
        );

        let extractor = HeaderExtractor(&headers);
        assert_eq!(
            extractor.get("traceparent"),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
        assert_eq!(extractor.keys(), vec!["traceparent"]);
        assert_eq!(extractor.get("tracestate"), None);
    }

    #[tokio::test]
    async fn test_layer_passes_response_through() {
        let inner = service_fn(|req: http::Request<String>| async move {
            let body = format!("handled {}", req.uri().path());
            Ok::<_, Infallible>(http::Response::new(body))
        });
        let service = RequestLoggingLayer.layer(inner);

        let request = http::Request::builder()
            .uri("/blog_service.v1.BlogService/ReadPost")
            .body(String::new())
            .expect("valid request");
        let before = GRPC_REQUESTS_TOTAL
            .with_label_values(&["/blog_service.v1.BlogService/ReadPost", "0"])
            .get();

        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.body(), "handled /blog_service.v1.BlogService/ReadPost");
        let after = GRPC_REQUESTS_TOTAL
            .with_label_values(&["/blog_service.v1.BlogService/ReadPost", "0"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn test_layer_passes_errors_through() {
        let inner = service_fn(|_req: http::Request<String>| async move {
            Err::<http::Response<String>, _>("boom".to_string())
        });
        let service = RequestLoggingLayer.layer(inner);

        let request = http::Request::builder()
            .uri("/blog_service.v1.BlogService/CreatePost")
            .body(String::new())
            .expect("valid request");

        let err = service.oneshot(request).await.unwrap_err();
        assert_eq!(err, "boom");
    }
}
