// src/core/protocol/codec.rs

//! Implements the `Encoder` and `Decoder` pair for the exec protocol.
//!
//! Requests are written as raw statement bytes. Responses carry no length
//! prefix, so the decoder needs to be told how a response ends: either it is
//! whatever one bounded read delivered (`Unframed`, the server's legacy
//! behaviour) or it runs up to a `\0` sentinel (`NulTerminated`).

use super::response::Response;
use super::statement::Statement;
use crate::core::ClientError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Capacity of the single read in unframed mode.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 2048;

/// Upper bound on a sentinel-framed response.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

const SENTINEL: u8 = b'\0';

/// How response boundaries are recognised on the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One read of at most `capacity` bytes is the whole response. A response
    /// that fills the buffer is flagged as possibly truncated; the rest of it
    /// stays unread on the socket.
    Unframed { capacity: usize },
    /// Bytes up to (excluding) the next `\0` form one response.
    NulTerminated { max_size: usize },
}

impl Default for Framing {
    fn default() -> Self {
        Framing::Unframed {
            capacity: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// A `tokio_util::codec` implementation for statements and responses.
#[derive(Debug, Clone, Default)]
pub struct ExecCodec {
    framing: Framing,
}

impl ExecCodec {
    pub fn new(framing: Framing) -> Self {
        Self { framing }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }
}

impl Encoder<&Statement> for ExecCodec {
    type Error = ClientError;

    fn encode(&mut self, item: &Statement, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Decoder for ExecCodec {
    type Item = Response;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match self.framing {
            Framing::Unframed { capacity } => {
                let truncated = src.len() >= capacity;
                let body = src.split_to(src.len().min(capacity)).freeze();
                // Anything beyond the capacity would belong to no response.
                src.clear();
                Ok(Some(Response::new(body, truncated)))
            }
            Framing::NulTerminated { max_size } => {
                match src.iter().position(|&b| b == SENTINEL) {
                    Some(pos) => {
                        if pos > max_size {
                            return Err(ClientError::ResponseTooLarge { limit: max_size });
                        }
                        let body = src.split_to(pos).freeze();
                        src.advance(1);
                        Ok(Some(Response::new(body, false)))
                    }
                    None if src.len() > max_size => {
                        Err(ClientError::ResponseTooLarge { limit: max_size })
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// A peer that closes after its last response without a sentinel still
    /// delivered that response.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                let body = src.split().freeze();
                Ok(Some(Response::new(body, false)))
            }
        }
    }
}
