use super::app_error::AppError;
use super::state::HttpServerState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Route label used for requests that did not match any route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Prometheus collectors of the registry HTTP server.
///
/// Each server owns its own registry.
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests: IntCounterVec,
}

impl HttpMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new(
                "registry_http_requests",
                "Number of HTTP requests handled by the registry",
            ),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { registry, requests })
    }

    pub fn observe(&self, route: &str, status: u16) {
        self.requests
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    pub fn request_count(&self, route: &str, status: u16) -> u64 {
        self.requests
            .with_label_values(&[route, &status.to_string()])
            .get()
    }

    pub fn encode(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

/// Counts every request by matched route and response status, 404s included.
pub async fn track_requests(
    State(state): State<HttpServerState>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let response = next.run(request).await;
    state.metrics.observe(&route, response.status().as_u16());
    response
}

/// Prometheus text exposition of the registry metrics.
pub async fn metrics_handler(State(state): State<HttpServerState>) -> Result<Response, AppError> {
    let (content_type, body) = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
