//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (env-filtered tracing subscriber)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields (request_id, route, path) on every event
//! - Metric updates are cheap atomic operations; safe on the hot path

pub mod logging;
pub mod metrics;
