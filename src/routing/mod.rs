//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Upgrade request path
//!     → router.rs (strip prefix, isolate channel segment)
//!     → channel.rs (map segment onto the fixed channel set)
//!     → Return: Channel or RouteRejection
//! ```
//!
//! # Design Decisions
//! - Channel set is closed and known at compile time
//! - Rejection happens before any WebSocket handshake
//! - Deterministic: same path always resolves the same way

pub mod channel;
pub mod router;

pub use channel::Channel;
pub use router::{ChannelRouter, RouteRejection};
