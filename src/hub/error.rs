//! Hub Error Types
//!
//! Errors surfaced by the subscription path, plus the per-sink write
//! failure that the broadcaster recovers from locally.

use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of the subscription manager
#[derive(Debug, Error)]
pub enum HubError {
    /// Stream identifier is empty or whitespace-only
    #[error("Invalid stream ID: {0:?}")]
    InvalidStreamId(String),

    /// Hub-wide connection limit reached
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    /// Hub is draining and no longer accepts subscribers
    #[error("Hub is shutting down")]
    ShuttingDown,

    /// The client sink was closed before it could be registered
    #[error("Client closed before subscription completed")]
    ClientClosed,

    /// Event could not be serialized
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure writing a frame to a single client sink
///
/// Never propagated past the broadcaster: the sink is pruned instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// Receiving half was dropped (client went away)
    #[error("Client sink closed")]
    Closed,

    /// Client did not drain its buffer in time
    #[error("Client write timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HubError::InvalidStreamId("  ".to_string()).to_string(),
            "Invalid stream ID: \"  \""
        );
        assert_eq!(
            HubError::TooManyConnections(3).to_string(),
            "Too many connections (limit: 3)"
        );
        assert_eq!(
            SinkError::TimedOut(Duration::from_millis(5)).to_string(),
            "Client write timed out after 5ms"
        );
    }
}
