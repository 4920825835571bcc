//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Binding created
//!     → supervisor.rs (actor task per binding)
//!         → connector.rs (derive ws(s):// address, attach credential, connect)
//!         → state.rs (Disconnected → Connecting → Connected)
//!     → frames relayed both ways (frame.rs)
//!     → on close/error: state.rs grows delay, supervisor sleeps, reconnects
//!     → on terminate: Terminated, socket closed, timer dropped
//! ```
//!
//! # Design Decisions
//! - One upstream socket per binding, never shared
//! - Upstream failures stay inside the supervisor
//! - The connector is a trait so tests can supply in-memory sockets

pub mod connector;
pub mod frame;
pub mod state;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{upstream_url, TungsteniteConnector, UpstreamConnector, UpstreamError};
pub use frame::Frame;
pub use state::{LinkState, UpstreamLink};
pub use supervisor::{Supervisor, SupervisorHandle};
