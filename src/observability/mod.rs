//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (request ids, statuses) instead of formatted strings
//! - Request ID flows through envelope logs via the `x-request-id` header
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
