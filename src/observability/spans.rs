//! Spans carrying binding correlation IDs.

use tracing::Span;

use crate::net::BindingId;
use crate::routing::Channel;

/// Span wrapping a binding task and the supervisor it spawns.
pub fn binding_span(id: BindingId, channel: Channel) -> Span {
    tracing::info_span!("binding", binding_id = %id, channel = %channel)
}
