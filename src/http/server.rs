use super::metrics::{metrics_handler, track_requests};
use super::registry::{bulk_status, list_documents, register};
use super::state::HttpServerState;
use crate::config;
use crate::http::app_error::ErrorsResponse;
use crate::http::registry::{__path_bulk_status, __path_list_documents, __path_register};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace;
use tower_http::{ServiceBuilderExt, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{Level, event};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

/// Connections still open after `close()` are dropped after this delay.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "Registry", description = "Indicator document registry API"),
    ),
    paths(register, list_documents, bulk_status),
    components(schemas(ErrorsResponse)),
)]
struct ApiDoc;

pub fn build_app_routes(state: HttpServerState) -> Result<Router> {
    let config = config::get()?;
    let max_body_layer = DefaultBodyLimit::max(config.parse_http_body_limit()?);

    // List of headers that shouldn't be logged
    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();

    // Middleware creation
    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .sensitive_response_headers(sensitive_headers)
        .layer(timeout_layer(config.http_server_timeout()))
        .compression()
        .into_inner();

    let app = Router::new()
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route("/v1/register", post(register).layer(max_body_layer.clone()))
        .route("/v1/indicator-documents", get(list_documents))
        .route(
            "/v1/indicator-documents/{uid}/bulk_status",
            post(bulk_status).layer(max_body_layer),
        )
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), track_requests))
        .layer(middleware)
        .with_state(state);

    Ok(app)
}

/// Requests running longer than `timeout` are answered with a 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found")
}

/// Stops a running [`RegistryServer`].
#[derive(Clone, Debug)]
pub struct ServerHandle {
    handle: Handle<SocketAddr>,
}

impl ServerHandle {
    /// Stops accepting connections and lets in-flight requests finish
    /// within the grace period.
    pub fn close(&self) {
        event!(Level::INFO, "Shutting down the registry HTTP server");
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
    }

    /// Address the server listens on, once it is bound.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }
}

pub struct RegistryServer {
    router: Router,
    address: SocketAddr,
    tls: Option<Arc<rustls::ServerConfig>>,
    handle: Handle<SocketAddr>,
}

impl RegistryServer {
    /// Without a TLS configuration the server speaks plain HTTP.
    pub fn new(
        state: HttpServerState,
        address: SocketAddr,
        tls: Option<rustls::ServerConfig>,
    ) -> Result<Self> {
        let handle: Handle<SocketAddr> = Handle::new();
        Ok(Self {
            router: build_app_routes(state)?,
            address,
            tls: tls.map(Arc::new),
            handle,
        })
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            handle: self.handle.clone(),
        }
    }

    pub async fn serve(self) -> Result<()> {
        let service = self.router.into_make_service();
        match self.tls {
            Some(tls) => {
                event!(
                    Level::INFO,
                    "Starting registry HTTPS server with mutual TLS on {}",
                    self.address
                );
                axum_server::bind_rustls(self.address, RustlsConfig::from_config(tls))
                    .handle(self.handle)
                    .serve(service)
                    .await
                    .context("Registry HTTPS server failed")?;
            }
            None => {
                event!(
                    Level::WARN,
                    "Starting registry HTTP server without TLS on {}",
                    self.address
                );
                axum_server::bind(self.address)
                    .handle(self.handle)
                    .serve(service)
                    .await
                    .context("Registry HTTP server failed")?;
            }
        }
        Ok(())
    }
}
