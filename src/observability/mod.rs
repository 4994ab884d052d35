//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health monitor and dispatcher produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin diagnostics (see admin/)
//! ```

pub mod logging;
pub mod metrics;
