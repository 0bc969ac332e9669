//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, tracing, limits)
//!     → routing::Mux (match method + path, bind params)
//!     → context.rs (handler reads request, writes buffered response)
//!     → Send to client
//! ```

pub mod context;
pub mod server;

pub use context::{Context, Form, FormFile, MultipartForm};
pub use server::{HttpServer, MakeRequestUuidV4, X_REQUEST_ID};
