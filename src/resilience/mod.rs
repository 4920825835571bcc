//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream connection lost:
//!     → backoff.rs (delay before the next attempt)
//!     → upstream::supervisor sleeps, then reconnects
//! ```
//!
//! # Design Decisions
//! - Growth is bounded; a dead upstream is retried at most once per max delay
//! - Delay resets after every successful connect

pub mod backoff;

pub use backoff::Backoff;
