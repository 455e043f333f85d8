//! Error types for the SAM bridge client.

use thiserror::Error;

use crate::protocol::ReplyStatus;

/// Main error type for SAM operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on a bridge socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bridge closed the connection without sending a reply.
    #[error("empty reply from bridge")]
    EmptyReply,

    /// The bridge rejected the HELLO version negotiation.
    #[error("handshake rejected: {status}")]
    Handshake {
        /// Status returned in the HELLO REPLY.
        status: ReplyStatus,
    },

    /// The bridge answered a request with a non-OK result.
    #[error("bridge replied {status}: {message}")]
    Bridge {
        /// Classified `RESULT=` value.
        status: ReplyStatus,
        /// `MESSAGE=` diagnostic text, often empty.
        message: String,
    },
}

impl Error {
    /// Returns true if this failure invalidates the whole session.
    ///
    /// Session-fatal failures are those where the bridge has lost or
    /// rejected the session itself rather than the present request:
    /// transport failures, empty replies, rejected handshakes, and
    /// INVALID_ID. Everything else fails the call but leaves the session
    /// usable.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Error::Io(_) | Error::EmptyReply | Error::Handshake { .. } => true,
            Error::Bridge { status, .. } => *status == ReplyStatus::InvalidId,
        }
    }
}

/// Convenience result type for SAM operations.
pub type Result<T> = std::result::Result<T, Error>;
