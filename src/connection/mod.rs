// src/connection/mod.rs

//! The client side of one server session: the socket-owning `Connection` and
//! the `Session` wrapper that tracks inferred transaction state.

mod client;
mod session;

pub use client::Connection;
pub use session::{Session, TxnState};
