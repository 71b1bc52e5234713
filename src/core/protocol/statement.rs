// src/core/protocol/statement.rs

//! Statements are the unit of the exec protocol: one complete, semicolon
//! terminated command, sent verbatim with no length prefix or delimiter.

use crate::core::ClientError;
use std::fmt;

/// An immutable UTF-8 statement as it will appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement(String);

/// The transaction-control class of a statement. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Begin,
    Commit,
    Abort,
    Other,
}

/// A literal value in an `insert`, `update` or `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Char(String),
}

/// Column types understood by the server's `create table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Char(usize),
}

/// A single column definition for `create table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

/// An equality predicate `column = value`. Multiple predicates are joined with `and`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

impl Statement {
    /// Wraps arbitrary text. The caller is responsible for it being one statement.
    pub fn raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Classifies transaction-control statements so a session can track its
    /// inferred transaction state. `rollback;` is treated as `abort;`.
    pub fn kind(&self) -> StatementKind {
        let keyword = self
            .0
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "begin" => StatementKind::Begin,
            "commit" => StatementKind::Commit,
            "abort" | "rollback" => StatementKind::Abort,
            _ => StatementKind::Other,
        }
    }

    pub fn begin() -> Self {
        Self::raw("begin;")
    }

    pub fn commit() -> Self {
        Self::raw("commit;")
    }

    pub fn abort() -> Self {
        Self::raw("abort;")
    }

    pub fn drop_table(table: &str) -> Self {
        Self(format!("drop table {table};"))
    }

    pub fn create_table(table: &str, columns: &[ColumnDef]) -> Self {
        let cols = columns
            .iter()
            .map(ColumnDef::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self(format!("create table {table} ({cols});"))
    }

    /// Renders `create index <table>(col,...);`, the server's index syntax.
    pub fn create_index(table: &str, columns: &[&str]) -> Self {
        Self(format!("create index {table}({});", columns.join(",")))
    }

    /// Fails with `InvalidLiteral` if any value has no literal form.
    pub fn insert(table: &str, values: &[Value]) -> Result<Self, ClientError> {
        let vals = values
            .iter()
            .map(|v| v.check().map(|()| v.to_string()))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        Ok(Self(format!("insert into {table} values ({vals});")))
    }

    pub fn select_where(table: &str, predicates: &[Predicate]) -> Result<Self, ClientError> {
        Ok(Self(format!(
            "select * from {table}{};",
            where_clause(predicates)?
        )))
    }

    pub fn update_where(
        table: &str,
        set: (&str, Value),
        predicates: &[Predicate],
    ) -> Result<Self, ClientError> {
        let (column, value) = set;
        value.check()?;
        Ok(Self(format!(
            "update {table} set {column} = {value}{};",
            where_clause(predicates)?
        )))
    }
}

fn where_clause(predicates: &[Predicate]) -> Result<String, ClientError> {
    if predicates.is_empty() {
        return Ok(String::new());
    }
    let conds = predicates
        .iter()
        .map(|p| p.value.check().map(|()| p.to_string()))
        .collect::<Result<Vec<_>, _>>()?
        .join(" and ");
    Ok(format!(" where {conds}"))
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Statement {
    fn from(s: &str) -> Self {
        Self::raw(s)
    }
}

impl From<String> for Statement {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Value {
    /// NaN and the infinities have no literal in the server's grammar.
    pub fn check(&self) -> Result<(), ClientError> {
        match self {
            Value::Float(x) if !x.is_finite() => Err(ClientError::InvalidLiteral(format!(
                "float {x} cannot be written as a literal"
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Value {
    /// Floats are written in plain decimal notation and always carry a
    /// fractional part (`90.0`, never `90` or `1e16`) so the server parses them
    /// as floats. Strings are single-quoted with `'` doubled.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                let mut buf = ryu::Buffer::new();
                let shortest = buf.format(*x);
                if !x.is_finite() || !shortest.contains('e') {
                    return f.write_str(shortest);
                }
                // ryu switched to exponent form; std never does.
                let plain = x.to_string();
                if plain.contains('.') {
                    f.write_str(&plain)
                } else {
                    write!(f, "{plain}.0")
                }
            }
            Value::Char(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Char(s.to_string())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => f.write_str("int"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Char(n) => write!(f, "char({n})"),
        }
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)
    }
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}
