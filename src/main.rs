//! pathmux demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ routing::Mux ──▶ handler  │
//!                           │   (request id,      (method table,    (Context│
//!     Client Response       │    trace, limits)    regex match)     writes) │
//!     ◀─────────────────────┼── buffered response ◀─────────────────────────┤
//!                           │                                              │
//!                           │   config · observability · lifecycle         │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;

use pathmux::config::{load_config, validation::validate_config, ConfigError, MuxConfig};
use pathmux::lifecycle::{self, signals, Shutdown};
use pathmux::observability::logging;
use pathmux::Mux;

#[derive(Parser)]
#[command(name = "pathmux")]
#[command(about = "Demo server for the pathmux router", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pathmux starting");

    let mux = Mux::from_config(&config);
    register_demo_routes(&mux);

    let shutdown = Shutdown::new();
    let running = lifecycle::start(config, mux, &shutdown).await?;

    signals::wait_for_shutdown().await;
    shutdown.trigger();
    running.task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn register_demo_routes(mux: &Mux) {
    mux.get("/", |ctx| {
        ctx.string(StatusCode::OK, "pathmux is running\n");
    })
    .get("/hello/:name", |ctx| {
        let name = ctx.param("name").unwrap_or_default().to_string();
        ctx.string(StatusCode::OK, format!("hello, {name}\n"));
    })
    .get("/item/:id([0-9]+)", |ctx| {
        let id = ctx.param("id").unwrap_or_default().to_string();
        let verbose = ctx.query_value("verbose").is_some();
        if let Err(err) = ctx.write_json(StatusCode::OK, &json!({ "id": id, "verbose": verbose })) {
            tracing::error!(error = %err, "Failed to encode response");
            ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    })
    .post("/echo", |ctx| {
        let body = ctx.body().clone();
        ctx.write_header(StatusCode::OK);
        ctx.response_headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/octet-stream"),
        );
        if let Err(err) = std::io::Write::write_all(ctx, &body) {
            tracing::error!(error = %err, "Failed to write echo body");
        }
    });
}
