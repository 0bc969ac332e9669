//! Request dispatch.
//!
//! # Responsibilities
//! - Registration API, one method per HTTP verb
//! - Resolve each request to at most one handler
//! - Build the per-request [`Context`] and invoke the handler
//! - Answer unmatched requests with 404 Not Found
//!
//! # Design Decisions
//! - `Mux` is a cheap handle over a shared table; clones see the same routes,
//!   including routes registered while serving
//! - Handlers run synchronously; panics are not caught here
//! - Only the path component is matched, never the query string

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;

use crate::config::MuxConfig;
use crate::error::CompileError;
use crate::http::Context;
use crate::observability::metrics;
use crate::routing::table::{Precedence, RouteMatch, RouteTable};

/// A route handler.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// Default cap on buffered request bodies (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Method and path router.
///
/// ```
/// use pathmux::Mux;
/// use axum::http::StatusCode;
///
/// let mux = Mux::new();
/// mux.get("/user/:name", |ctx| {
///     let name = ctx.param("name").unwrap_or_default().to_string();
///     ctx.string(StatusCode::OK, format!("hello {name}"));
/// })
/// .get("/item/:id([0-9]+)", |ctx| {
///     let id = ctx.param("id").unwrap_or_default().to_string();
///     ctx.string(StatusCode::OK, id);
/// });
/// ```
#[derive(Clone)]
pub struct Mux {
    table: Arc<RouteTable<Handler>>,
    max_body_bytes: usize,
}

impl Mux {
    /// Create an empty router with specificity precedence.
    pub fn new() -> Self {
        Self::with_precedence(Precedence::default())
    }

    pub fn with_precedence(precedence: Precedence) -> Self {
        Self {
            table: Arc::new(RouteTable::new(precedence)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &MuxConfig) -> Self {
        Self::with_precedence(config.routing.precedence).max_body_bytes(config.limits.max_body_bytes)
    }

    /// Cap the request body buffered for handlers.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Register `handler` for `method` and `pattern`, reporting compile errors.
    pub fn try_handle<F>(&self, method: Method, pattern: &str, handler: F) -> Result<(), CompileError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.table.register(method, pattern, Arc::new(handler))
    }

    /// Register `handler` for `method` and `pattern`.
    ///
    /// A pattern that fails to compile is logged and skipped; other routes
    /// are unaffected.
    pub fn handle<F>(&self, method: Method, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        // The table already logged the failure.
        let _ = self.try_handle(method, pattern, handler);
        self
    }

    pub fn get<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::GET, pattern, handler)
    }

    pub fn head<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::HEAD, pattern, handler)
    }

    pub fn post<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::POST, pattern, handler)
    }

    pub fn put<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::PUT, pattern, handler)
    }

    pub fn delete<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, pattern, handler)
    }

    pub fn connect<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::CONNECT, pattern, handler)
    }

    pub fn options<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, pattern, handler)
    }

    pub fn trace<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::TRACE, pattern, handler)
    }

    pub fn patch<F>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, pattern, handler)
    }

    /// Patterns registered for `method`, in resolution order.
    pub fn routes(&self, method: &Method) -> Vec<String> {
        self.table.patterns(method)
    }

    /// Total number of registered routes.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Route a buffered request and run the matching handler.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response {
        let lookup = self.table.lookup(request.method(), request.uri().path());

        match lookup {
            Ok(RouteMatch {
                handler,
                params,
                pattern,
            }) => {
                tracing::debug!(
                    method = %request.method(),
                    path = %request.uri().path(),
                    pattern = %pattern,
                    "Route matched"
                );
                metrics::record_dispatch(request.method().as_str(), "matched");

                let mut ctx = Context::new(request, params);
                handler(&mut ctx);
                ctx.into_response()
            }
            Err(err) => {
                tracing::warn!(
                    method = %request.method(),
                    target = %request.uri(),
                    reason = err.kind(),
                    "No route matched"
                );
                metrics::record_dispatch(request.method().as_str(), err.kind());
                not_found()
            }
        }
    }

    /// Expose this router as an axum service that handles every request.
    pub fn into_router(self) -> Router {
        Router::new().fallback(serve).with_state(self)
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

/// Buffer the body, then dispatch.
async fn serve(State(mux): State<Mux>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, mux.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(
                method = %parts.method,
                target = %parts.uri,
                limit = mux.max_body_bytes,
                error = %err,
                "Failed to buffer request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    mux.dispatch(Request::from_parts(parts, body))
}
