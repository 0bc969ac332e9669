//! Method and path router with named, regex-constrained parameters.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::MuxConfig;
pub use error::{CompileError, ContextError, DispatchError};
pub use http::{Context, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Mux, Params, Precedence};
