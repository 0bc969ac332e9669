//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     (method, "/user/:name/:id([0-9]+)", handler)
//!     → pattern.rs (compile to ^/user/([\w\s]+)/([0-9]+)$ + ["", name, id])
//!     → table.rs (insert under write lock, ordered by precedence)
//!
//! Incoming Request (method, path):
//!     → table.rs (read lock, first matching entry)
//!     → dispatcher.rs (bind params, build Context, invoke handler)
//!     → Response, or 404 Not Found
//! ```
//!
//! # Design Decisions
//! - Whole-path regex match per route, no trie
//! - Deterministic: same table and input always match the same route
//! - First match wins, in the table's precedence order

pub mod dispatcher;
pub mod params;
pub mod pattern;
pub mod table;

pub use dispatcher::{Handler, Mux};
pub use params::Params;
pub use pattern::{compile, CompiledPattern};
pub use table::{Precedence, RouteMatch, RouteTable};
