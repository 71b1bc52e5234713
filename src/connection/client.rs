// src/connection/client.rs

//! Defines `Connection`, the exclusive owner of one socket to the server and
//! the request/response primitive built on it.

use crate::config::ConnectionConfig;
use crate::core::ClientError;
use crate::core::protocol::{ExecCodec, Framing, Response, Statement};
use bytes::{BufMut, BytesMut};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

/// One live connection, which the server maps to exactly one session.
///
/// Calls alternate strictly: `exec` takes `&mut self`, so a second statement
/// cannot be sent before the previous response was read. The socket is released
/// when the `Connection` is dropped; `close` additionally shuts the write half
/// down so the server sees an orderly disconnect.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    codec: ExecCodec,
    read_buf: BytesMut,
    peer: SocketAddr,
    io_timeout: Option<Duration>,
    open: bool,
}

impl Connection {
    /// Connects to `addr` within the configured connect timeout.
    pub async fn dial(addr: &str, config: &ConnectionConfig) -> Result<Self, ClientError> {
        let stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ClientError::connect_failed(addr, e)),
            Err(_) => {
                return Err(ClientError::connect_failed(
                    addr,
                    io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                ));
            }
        };
        stream
            .set_nodelay(true)
            .map_err(|e| ClientError::connect_failed(addr, e))?;
        let peer = stream
            .peer_addr()
            .map_err(|e| ClientError::connect_failed(addr, e))?;

        let framing = config.framing();
        debug!("Connected to {} ({:?})", peer, framing);

        Ok(Self {
            stream,
            codec: ExecCodec::new(framing),
            read_buf: BytesMut::with_capacity(initial_capacity(framing)),
            peer,
            io_timeout: config.io_timeout,
            open: true,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// False once the peer closed the stream, a transport error occurred, or
    /// `close` was called.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Sends one statement and waits for its response.
    ///
    /// Any transport failure, or a framed response over the size limit, marks
    /// the connection closed; later calls fail with `InvalidState` instead of
    /// touching the socket again.
    pub async fn exec(&mut self, statement: &Statement) -> Result<Response, ClientError> {
        if !self.open {
            return Err(ClientError::InvalidState(format!(
                "connection to {} is closed",
                self.peer
            )));
        }

        let result = self.round_trip(statement).await;
        match &result {
            Ok(response) => {
                debug!(
                    "{} <- {} ({} bytes)",
                    self.peer,
                    statement,
                    response.len()
                );
                if response.is_truncated() {
                    warn!(
                        "Response to '{}' from {} filled the {} byte read buffer and may be truncated",
                        statement,
                        self.peer,
                        response.len()
                    );
                }
            }
            Err(e) => {
                debug!("{} <- {} failed: {}", self.peer, statement, e);
                // Unread bytes of an oversized response would be decoded as
                // the answer to the next statement.
                if e.poisons_connection() {
                    self.open = false;
                    self.read_buf.clear();
                }
            }
        }
        result
    }

    async fn round_trip(&mut self, statement: &Statement) -> Result<Response, ClientError> {
        // 1. Encode the statement; it goes out verbatim, with no framing.
        let mut write_buf = BytesMut::with_capacity(statement.as_bytes().len());
        self.codec.encode(statement, &mut write_buf)?;

        // 2. Send it in full before reading anything.
        with_timeout(
            self.io_timeout,
            "writing a statement",
            self.stream.write_all(&write_buf),
        )
        .await?;

        // 3. Read back exactly one response under the configured framing.
        match self.codec.framing() {
            Framing::Unframed { capacity } => self.read_once(capacity).await,
            Framing::NulTerminated { .. } => self.read_until_sentinel().await,
        }
    }

    /// Exactly one read of at most `capacity` bytes.
    async fn read_once(&mut self, capacity: usize) -> Result<Response, ClientError> {
        self.read_buf.clear();
        self.read_buf.reserve(capacity);
        // Never let one read pull in more than the server's buffer size.
        let mut limited = (&mut self.read_buf).limit(capacity);
        let n = with_timeout(
            self.io_timeout,
            "reading a response",
            self.stream.read_buf(&mut limited),
        )
        .await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        self.codec
            .decode(&mut self.read_buf)?
            .ok_or(ClientError::ConnectionClosed)
    }

    async fn read_until_sentinel(&mut self) -> Result<Response, ClientError> {
        loop {
            if let Some(response) = self.codec.decode(&mut self.read_buf)? {
                return Ok(response);
            }
            let n = with_timeout(
                self.io_timeout,
                "reading a response",
                self.stream.read_buf(&mut self.read_buf),
            )
            .await?;
            if n == 0 {
                // The peer is gone; whatever it sent last still counts.
                self.open = false;
                return self
                    .codec
                    .decode_eof(&mut self.read_buf)?
                    .ok_or(ClientError::ConnectionClosed);
            }
        }
    }

    /// Shuts the connection down in an orderly way and releases the socket.
    pub async fn close(mut self) -> Result<(), ClientError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        debug!("Closing connection to {}", self.peer);
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            // The peer hung up first; the socket is released either way.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.open {
            debug!(
                "Connection to {} dropped without close; releasing socket",
                self.peer
            );
        }
    }
}

fn initial_capacity(framing: Framing) -> usize {
    match framing {
        Framing::Unframed { capacity } => capacity,
        Framing::NulTerminated { max_size } => max_size.min(4096),
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    what: &'static str,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T, ClientError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(what))?
            .map_err(ClientError::from),
        None => fut.await.map_err(ClientError::from),
    }
}
