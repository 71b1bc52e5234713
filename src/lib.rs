// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod harness;

// Re-export
pub use crate::connection::{Connection, Session, TxnState};
pub use crate::core::ClientError;
