//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use pathmux::config::MuxConfig;
use pathmux::lifecycle::{self, Shutdown};
use pathmux::{Context, Mux};

/// A server bound to an ephemeral local port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start serving `mux` on 127.0.0.1 with an OS-assigned port.
#[allow(dead_code)]
pub async fn start_server(mux: Mux) -> TestServer {
    let mut config = MuxConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let shutdown = Shutdown::new();
    let running = lifecycle::start(config, mux, &shutdown).await.unwrap();

    TestServer {
        addr: running.local_addr,
        shutdown,
    }
}

/// Build a bodiless request.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

/// Build a bodiless axum request.
#[allow(dead_code)]
pub fn axum_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as UTF-8.
#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Handler that writes every bound parameter as `name=value` lines.
#[allow(dead_code)]
pub fn dump_params(ctx: &mut Context) {
    let text: String = ctx
        .params()
        .iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect();
    ctx.string(StatusCode::OK, text);
}
