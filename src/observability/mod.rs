//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Bindings and supervisors emit:
//!     → logging.rs (tracing subscriber, text or JSON)
//!     → metrics.rs (binding gauge, connect/forward/drop counters)
//!     → spans.rs (one span per binding: binding_id + channel)
//!
//! Sinks:
//!     → stdout
//!     → Prometheus scrape listener (when enabled)
//! ```
//!
//! # Design Decisions
//! - Supervisor tasks inherit the binding span, so every upstream event
//!   carries the binding ID
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
pub mod spans;
