//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Upgraded downstream connection
//!     → connection.rs (register, binding ID, close token)
//!     → Hand off to the binding task
//!     → guard dropped on exit (unregister)
//!
//! Shutdown:
//!     close_all → bindings close their sockets → wait_for_drain
//! ```
//!
//! # Design Decisions
//! - Each connection tracked for graceful shutdown
//! - Registry scoped to one server instance

pub mod connection;

pub use connection::{BindingId, BindingInfo, ConnectionGuard, ConnectionRegistry};
