//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Route table and dispatcher produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (dispatch and registration counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
