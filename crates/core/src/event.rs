//! Events emitted by the request handler.

use crate::RequestId;

/// An event emitted by the request handler for one in-flight request.
///
/// Events for a given id arrive in chunk order; nothing is emitted for an
/// id after its `Finished` event, and nothing at all after cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerEvent {
    /// Incremental output for a request.
    Completion {
        /// Correlation id echoed from the submitted envelope.
        id: RequestId,
        /// The accumulated response text so far (stop-word truncated).
        text: String,
        /// The text contributed by this chunk alone.
        delta: String,
        /// Whether this is the last completion event for the request.
        is_complete: bool,
    },
    /// Terminal event: the request left the streaming state.
    Finished {
        /// Correlation id echoed from the submitted envelope.
        id: RequestId,
        /// Whether the request completed without error.
        success: bool,
        /// Human-readable error description; empty on success.
        error: String,
    },
}

impl HandlerEvent {
    /// The correlation id this event belongs to.
    pub fn id(&self) -> &RequestId {
        match self {
            Self::Completion { id, .. } | Self::Finished { id, .. } => id,
        }
    }
}
