// src/core/mod.rs

//! Error taxonomy and the exec protocol shared by connections and scenarios.

pub mod errors;
pub mod protocol;

pub use errors::ClientError;
pub use protocol::{Response, Statement};
