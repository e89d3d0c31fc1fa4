//! Transport error types.

use std::io;

use puma_wire::WireError;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures talking to a central decision point.
///
/// None of these escape a remote evaluator module: the module recovers with
/// one reconnect-and-retry and degrades to DENY.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection could be established.
    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// The call deadline expired.
    #[error("deadline expired")]
    Timeout,

    /// Stream I/O failed.
    #[error("i/o error: {0}")]
    Io(io::Error),

    /// Encoding or decoding failed.
    #[error("wire protocol error: {0}")]
    Wire(WireError),

    /// The response answers a different request; the stream is out of sync.
    #[error("response for request {got} while waiting for {expected}")]
    RequestIdMismatch { expected: u64, got: u64 },

    /// The HTTP endpoint answered with a non-success status.
    #[error("http status {status}")]
    HttpStatus { status: u16 },

    /// The HTTP client failed below the status level.
    #[error("http transport error: {0}")]
    Http(String),

    /// The central decision point replied with an error.
    #[error("remote error: {0}")]
    Remote(String),
}

impl TransportError {
    pub fn connect(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connect {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        if is_timeout(&err) {
            Self::Timeout
        } else {
            Self::Io(err)
        }
    }
}

impl From<WireError> for TransportError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(io) => Self::from(io),
            other => Self::Wire(other),
        }
    }
}
