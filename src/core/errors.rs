// src/core/errors.rs

//! Defines the primary error type for the client and the isolation harness.

use std::sync::Arc;
use thiserror::Error;

/// Every failure a `Connection`, `Session` or scenario can report to its caller.
///
/// Transport failures are values, not process exits: the caller decides whether
/// to retry, abort the scenario, or propagate. Statements the server rejects are
/// not errors at this level; their text comes back as an ordinary `Response`.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Timed out while {0}")]
    Timeout(&'static str),

    #[error("Response exceeds the {limit} byte limit")]
    ResponseTooLarge { limit: usize },

    #[error("Command not allowed in the current state: {0}")]
    InvalidState(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

impl ClientError {
    /// Wraps a dial-time IO failure together with the address that was dialed.
    pub fn connect_failed(addr: impl Into<String>, source: std::io::Error) -> Self {
        ClientError::ConnectFailed {
            addr: addr.into(),
            source: Arc::new(source),
        }
    }

    /// True when the connection can no longer be used: the socket failed, or
    /// the response stream lost its framing.
    pub fn poisons_connection(&self) -> bool {
        self.is_transport() || matches!(self, ClientError::ResponseTooLarge { .. })
    }

    /// True for failures of the underlying socket, as opposed to misuse of the client.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectFailed { .. }
                | ClientError::Io(_)
                | ClientError::ConnectionClosed
                | ClientError::Timeout(_)
        )
    }
}

// `std::io::Error` is not cloneable, hence the Arc and the manual impl.
impl Clone for ClientError {
    fn clone(&self) -> Self {
        match self {
            ClientError::ConnectFailed { addr, source } => ClientError::ConnectFailed {
                addr: addr.clone(),
                source: Arc::clone(source),
            },
            ClientError::Io(e) => ClientError::Io(Arc::clone(e)),
            ClientError::ConnectionClosed => ClientError::ConnectionClosed,
            ClientError::Timeout(what) => ClientError::Timeout(what),
            ClientError::ResponseTooLarge { limit } => {
                ClientError::ResponseTooLarge { limit: *limit }
            }
            ClientError::InvalidState(s) => ClientError::InvalidState(s.clone()),
            ClientError::UnexpectedResponse(s) => ClientError::UnexpectedResponse(s.clone()),
            ClientError::InvalidLiteral(s) => ClientError::InvalidLiteral(s.clone()),
        }
    }
}

impl PartialEq for ClientError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ClientError::ConnectFailed {
                    addr: a1,
                    source: e1,
                },
                ClientError::ConnectFailed {
                    addr: a2,
                    source: e2,
                },
            ) => a1 == a2 && e1.kind() == e2.kind(),
            (ClientError::Io(e1), ClientError::Io(e2)) => e1.to_string() == e2.to_string(),
            (ClientError::Timeout(w1), ClientError::Timeout(w2)) => w1 == w2,
            (
                ClientError::ResponseTooLarge { limit: l1 },
                ClientError::ResponseTooLarge { limit: l2 },
            ) => l1 == l2,
            (ClientError::InvalidState(s1), ClientError::InvalidState(s2)) => s1 == s2,
            (ClientError::UnexpectedResponse(s1), ClientError::UnexpectedResponse(s2)) => {
                s1 == s2
            }
            (ClientError::InvalidLiteral(s1), ClientError::InvalidLiteral(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(Arc::new(e))
    }
}
