//! Error taxonomy for the orchestration core.

use compact_str::CompactString;

/// Failures the core can surface to its caller.
///
/// Caller-initiated cancellation is not an error and has no variant here;
/// a cancelled request simply stops emitting events.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider is registered under the configured name.
    #[error("unknown provider: {0}")]
    UnknownProvider(CompactString),

    /// No template is registered under the configured name.
    #[error("unknown template: {0}")]
    UnknownTemplate(CompactString),

    /// Connection or status failure from the transport.
    #[error("transport: {0}")]
    Transport(String),

    /// A complete frame that could not be parsed. Partial frames are
    /// buffered, never reported.
    #[error("malformed chunk: {0}")]
    Parse(String),
}
