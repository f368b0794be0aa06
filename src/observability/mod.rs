//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pair forwarders produce:
//!     → logging.rs (structured log events, one span per pair)
//!     → metrics.rs (per-pair counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
