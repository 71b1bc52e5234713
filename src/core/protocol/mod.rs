// src/core/protocol/mod.rs

pub mod codec;
pub mod response;
pub mod statement;
pub use codec::{ExecCodec, Framing};
pub use response::{Response, ResultSet};
pub use statement::{ColumnDef, ColumnType, Predicate, Statement, StatementKind, Value};
