//! Route storage.
//!
//! # Responsibilities
//! - Hold compiled routes per HTTP method
//! - Replace the entry for a (method, pattern) pair on re-registration
//! - Resolve a path to the first matching entry
//!
//! # Design Decisions
//! - One reader-writer lock for the whole table: registrations exclusive,
//!   lookups shared
//! - Patterns compile before the write lock is taken; logging and metrics run
//!   after it is released
//! - Entries are kept in an explicit order so resolution is reproducible
//! - Lookups hand back a clone of the handler; the lock is released before
//!   the handler runs

use std::collections::HashMap;

use axum::http::Method;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, DispatchError};
use crate::observability::metrics;
use crate::routing::pattern::{compile, CompiledPattern};
use crate::routing::Params;

/// Order in which a method's routes are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Routes with more literal segments first; ties keep registration order.
    #[default]
    Specificity,
    /// Routes are tried in the order they were first registered.
    Registration,
}

/// A compiled pattern and the handler registered for it.
#[derive(Debug)]
struct Entry<H> {
    compiled: CompiledPattern,
    handler: H,
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<H> {
    pub handler: H,
    pub params: Params,
    /// Pattern of the entry that matched.
    pub pattern: String,
}

/// Routes grouped by method, guarded by a single lock.
#[derive(Debug)]
pub struct RouteTable<H> {
    precedence: Precedence,
    routes: RwLock<HashMap<Method, Vec<Entry<H>>>>,
}

impl<H: Clone> RouteTable<H> {
    pub fn new(precedence: Precedence) -> Self {
        Self {
            precedence,
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Compile `pattern` and store it under `method`.
    ///
    /// Registering a pattern string that already exists for the method
    /// replaces its handler and keeps its position. On a compile error the
    /// table is left untouched.
    pub fn register(&self, method: Method, pattern: &str, handler: H) -> Result<(), CompileError> {
        let compiled = match compile(pattern) {
            Ok(compiled) => compiled,
            Err(err) => {
                tracing::error!(method = %method, pattern = %pattern, error = %err, "Route registration skipped");
                return Err(err);
            }
        };

        let literal_segments = compiled.literal_segments();
        let position = {
            let mut routes = self.routes.write();
            let entries = routes.entry(method.clone()).or_default();

            match entries.iter().position(|e| e.compiled.pattern() == pattern) {
                Some(existing) => {
                    entries[existing] = Entry { compiled, handler };
                    None
                }
                None => {
                    let position = match self.precedence {
                        Precedence::Registration => entries.len(),
                        Precedence::Specificity => entries
                            .iter()
                            .position(|e| e.compiled.literal_segments() < literal_segments)
                            .unwrap_or(entries.len()),
                    };
                    entries.insert(position, Entry { compiled, handler });
                    Some(position)
                }
            }
        };

        match position {
            Some(position) => {
                tracing::debug!(method = %method, pattern = %pattern, position, "Route registered");
                metrics::record_route_registered(method.as_str());
            }
            None => tracing::debug!(method = %method, pattern = %pattern, "Route replaced"),
        }
        Ok(())
    }

    /// Find the first route for `method` whose pattern matches `path`.
    ///
    /// `path` must be the path component only, without the query string.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<RouteMatch<H>, DispatchError> {
        let routes = self.routes.read();

        let entries = match routes.get(method) {
            Some(entries) if !entries.is_empty() => entries,
            _ => {
                return Err(DispatchError::NoRouteForMethod {
                    method: method.clone(),
                })
            }
        };

        entries
            .iter()
            .find_map(|entry| {
                entry.compiled.match_path(path).map(|params| RouteMatch {
                    handler: entry.handler.clone(),
                    params,
                    pattern: entry.compiled.pattern().to_string(),
                })
            })
            .ok_or_else(|| DispatchError::NoMatchingPattern {
                method: method.clone(),
                path: path.to_string(),
            })
    }

    /// Patterns registered for `method`, in resolution order.
    pub fn patterns(&self, method: &Method) -> Vec<String> {
        self.routes
            .read()
            .get(method)
            .map(|entries| entries.iter().map(|e| e.compiled.pattern().to_string()).collect())
            .unwrap_or_default()
    }

    /// Total number of routes across all methods.
    pub fn len(&self) -> usize {
        self.routes.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Clone> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new(Precedence::default())
    }
}
