//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener and spawn the server task
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when routes are registered)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::MuxConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::Mux;

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// A server that is accepting connections.
pub struct Running {
    pub local_addr: SocketAddr,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

/// Start serving `mux` with `config`; the server stops when `shutdown` triggers.
pub async fn start(config: MuxConfig, mux: Mux, shutdown: &Shutdown) -> Result<Running, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: config.listener.bind_address.clone(),
        source,
    })?;

    tracing::info!(
        address = %local_addr,
        routes = mux.len(),
        precedence = ?config.routing.precedence,
        "Listening for connections"
    );

    let server = HttpServer::new(config, mux);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(Running { local_addr, task })
}
