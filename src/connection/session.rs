// src/connection/session.rs

//! Tracks the transaction state a client can infer for its server session.

use super::client::Connection;
use crate::config::ConnectionConfig;
use crate::core::ClientError;
use crate::core::protocol::{Response, Statement, StatementKind};
use std::fmt;
use tracing::{debug, warn};

/// The transaction state of a server session as inferred from the statements
/// sent on it. The server holds the authoritative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxnState {
    /// No transaction has been started; statements run in autocommit.
    #[default]
    NoTransaction,
    /// `begin;` was sent and neither `commit;` nor `abort;` has followed.
    InTransaction,
    /// The last transaction ended with `abort;`.
    Aborted,
    /// The last transaction ended with `commit;`.
    Committed,
}

impl TxnState {
    pub fn is_active(self) -> bool {
        self == TxnState::InTransaction
    }
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxnState::NoTransaction => "no-transaction",
            TxnState::InTransaction => "in-transaction",
            TxnState::Aborted => "aborted",
            TxnState::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// A named `Connection` together with its inferred `TxnState`.
///
/// A session carries at most one transaction at a time: a nested `begin;` is
/// rejected locally and never reaches the server.
#[derive(Debug)]
pub struct Session {
    name: String,
    conn: Connection,
    state: TxnState,
}

impl Session {
    pub fn new(name: impl Into<String>, conn: Connection) -> Self {
        Self {
            name: name.into(),
            conn,
            state: TxnState::NoTransaction,
        }
    }

    /// Dials `addr` and wraps the connection in a fresh session.
    pub async fn open(
        name: impl Into<String>,
        addr: &str,
        config: &ConnectionConfig,
    ) -> Result<Self, ClientError> {
        let conn = Connection::dial(addr, config).await?;
        Ok(Self::new(name, conn))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Sends `statement` and advances the inferred state according to its kind.
    ///
    /// The state moves only after a response arrived. Response text is not
    /// interpreted, so a statement the server refused still moves the state.
    pub async fn exec(&mut self, statement: &Statement) -> Result<Response, ClientError> {
        let kind = statement.kind();
        match kind {
            StatementKind::Begin if self.state.is_active() => {
                return Err(ClientError::InvalidState(format!(
                    "session '{}' already has an open transaction",
                    self.name
                )));
            }
            StatementKind::Commit | StatementKind::Abort if !self.state.is_active() => {
                warn!(
                    "Session '{}' sends '{}' without an open transaction",
                    self.name, statement
                );
            }
            _ => {}
        }

        let response = self.conn.exec(statement).await?;

        let next = match kind {
            StatementKind::Begin => TxnState::InTransaction,
            StatementKind::Commit if self.state.is_active() => TxnState::Committed,
            StatementKind::Abort if self.state.is_active() => TxnState::Aborted,
            _ => self.state,
        };
        if next != self.state {
            debug!("Session '{}': {} -> {}", self.name, self.state, next);
            self.state = next;
        }
        Ok(response)
    }

    pub async fn begin(&mut self) -> Result<Response, ClientError> {
        self.exec(&Statement::begin()).await
    }

    pub async fn commit(&mut self) -> Result<Response, ClientError> {
        self.exec(&Statement::commit()).await
    }

    pub async fn abort(&mut self) -> Result<Response, ClientError> {
        self.exec(&Statement::abort()).await
    }

    /// Closes the underlying connection.
    pub async fn close(self) -> Result<(), ClientError> {
        if self.state.is_active() {
            warn!(
                "Session '{}' closes with an open transaction; the server decides its fate",
                self.name
            );
        }
        self.conn.close().await
    }
}
