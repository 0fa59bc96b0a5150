//! Crate-wide error type
//!
//! One enum covers the whole failure surface: transport, protocol framing,
//! authentication, server-reported errors, configuration, decoding, and
//! interface misuse (arity mismatch, closed session).

use std::fmt;

use crate::protocol::ErrorFields;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Client error
#[derive(Debug)]
pub enum Error {
    /// Socket read/write failure
    Io(std::io::Error),

    /// Peer closed the connection (unexpected EOF)
    ConnectionClosed,

    /// Session was explicitly closed; no further operations are accepted
    SessionClosed,

    /// Reconnect was attempted but the session is still not open
    Disconnected,

    /// Malformed or unexpected wire message
    Protocol(String),

    /// Authentication failure (unsupported mechanism, failed challenge, ...)
    Authentication(String),

    /// ErrorResponse surfaced from the server with its decoded fields
    Server(ErrorFields),

    /// Invalid configuration or connection string
    Config(String),

    /// A field could not be decoded into its OID-mandated type
    Decode(String),

    /// Bound parameter count does not match the prepared statement
    ParameterCount {
        /// Parameters the statement expects
        expected: usize,
        /// Parameters the caller supplied
        got: usize,
    },

    /// Connection state machine violation
    InvalidState {
        /// What would have been a legal transition
        expected: String,
        /// The transition that was attempted
        actual: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::ConnectionClosed => write!(f, "connection closed by server"),
            Error::SessionClosed => write!(f, "session is closed"),
            Error::Disconnected => write!(f, "session is disconnected"),
            Error::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Error::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            Error::Server(fields) => write!(f, "server error: {}", fields),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Decode(msg) => write!(f, "decode error: {}", msg),
            Error::ParameterCount { expected, got } => write!(
                f,
                "statement takes {} parameters, {} were given",
                expected, got
            ),
            Error::InvalidState { expected, actual } => {
                write!(f, "invalid state transition: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl Error {
    /// Whether this error came from the server as an ErrorResponse.
    ///
    /// Server errors leave the connection usable (a ReadyForQuery has been
    /// consumed before the error is raised); everything else may not.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server(_))
    }

    /// The server's ErrorResponse fields, if this is a server error.
    pub fn server_fields(&self) -> Option<&ErrorFields> {
        match self {
            Error::Server(fields) => Some(fields),
            _ => None,
        }
    }
}
