//! Error types shared across the router.
//!
//! # Design Decisions
//! - Compile errors are recoverable: the offending route is dropped, others survive
//! - Dispatch errors never reach the client as-is; they map to 404 Not Found
//! - Handler failures are not represented here; they propagate to the transport

use axum::http::Method;
use thiserror::Error;

/// Failure to turn a route pattern into a matcher.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("pattern {pattern:?} compiled to an invalid expression: {source}")]
    InvalidExpression {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern {pattern:?} has a parameter marker without a name")]
    EmptyParamName { pattern: String },

    #[error("pattern {pattern:?} declares parameter {name:?} more than once")]
    DuplicateParam { pattern: String, name: String },

    /// A custom expression introduced capturing groups of its own, which would
    /// shift every later parameter binding.
    #[error("pattern {pattern:?} has {found} capture groups but {expected} parameters")]
    GroupMismatch {
        pattern: String,
        expected: usize,
        found: usize,
    },
}

impl CompileError {
    /// The pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        match self {
            CompileError::InvalidExpression { pattern, .. }
            | CompileError::EmptyParamName { pattern }
            | CompileError::DuplicateParam { pattern, .. }
            | CompileError::GroupMismatch { pattern, .. } => pattern,
        }
    }
}

/// Why a request could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no routes registered for method {method}")]
    NoRouteForMethod { method: Method },

    #[error("no route for {method} matches {path:?}")]
    NoMatchingPattern { method: Method, path: String },
}

impl DispatchError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoRouteForMethod { .. } => "no_route_for_method",
            DispatchError::NoMatchingPattern { .. } => "no_matching_pattern",
        }
    }
}

/// Failure reading the request through a [`Context`](crate::http::Context).
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("expected content type {expected}, got {found:?}")]
    UnsupportedContentType {
        expected: &'static str,
        found: Option<String>,
    },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid multipart body: {0}")]
    MultipartBoundary(#[from] axum::extract::multipart::MultipartRejection),

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("multipart body could not be read in one pass")]
    MultipartIncomplete,
}
