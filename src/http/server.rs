//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Host a [`Mux`] as the whole axum application
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener
//! - Stop accepting on the shutdown signal and drain in-flight requests

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Request};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::MuxConfig;
use crate::routing::Mux;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Assigns a random UUID v4 to requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// HTTP server hosting a router.
pub struct HttpServer {
    router: Router,
    config: MuxConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `mux`.
    pub fn new(config: MuxConfig, mux: Mux) -> Self {
        let router = Self::build_router(&config, mux);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &MuxConfig, mux: Mux) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        mux.into_router()
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuidV4))
    }

    /// The fully layered application, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let mux = Mux::new();
        mux.get("/ping", |ctx| ctx.string(StatusCode::OK, "pong"));
        let server = HttpServer::new(MuxConfig::default(), mux);

        let response = server
            .router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap();
        assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let mux = Mux::new();
        mux.get("/ping", |ctx| ctx.string(StatusCode::OK, "pong"));
        let server = HttpServer::new(MuxConfig::default(), mux);

        let response = server
            .router()
            .oneshot(
                Request::get("/ping")
                    .header(X_REQUEST_ID, "caller-chosen-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[X_REQUEST_ID], "caller-chosen-id");
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let mut config = MuxConfig::default();
        config.limits.max_body_bytes = 8;
        let mux = Mux::from_config(&config);
        mux.post("/upload", |ctx| ctx.write_header(StatusCode::NO_CONTENT));
        let server = HttpServer::new(config, mux);

        let response = server
            .router()
            .oneshot(
                Request::post("/upload")
                    .header("content-length", "32")
                    .body(Body::from(vec![b'x'; 32]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
