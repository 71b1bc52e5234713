// tests/integration/fixtures.rs

//! Common test fixtures: table layouts and rows shared across tests.

use oshinodb_client::core::protocol::{ColumnDef, ColumnType, Statement, Value};

pub const TEST_TABLE: &str = "fixture_grades";

/// The `(id, name, score)` layout used by most tests.
pub fn grade_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", ColumnType::Int),
        ColumnDef::new("name", ColumnType::Char(16)),
        ColumnDef::new("score", ColumnType::Float),
    ]
}

pub fn grade_row(id: i64, name: &str, score: f64) -> Vec<Value> {
    vec![Value::Int(id), Value::from(name), Value::Float(score)]
}

/// Statements that (re)create `table` with the grade layout.
pub fn create_grades(table: &str) -> Vec<Statement> {
    vec![
        Statement::create_table(table, &grade_columns()),
        Statement::create_index(table, &["id"]),
    ]
}

/// `count` inserts with ids `1..=count` and a fixed-width name, so the rendered
/// result of `select *` grows linearly with `count`.
#[allow(dead_code)]
pub fn bulk_inserts(table: &str, count: i64) -> Vec<Statement> {
    (1..=count)
        .map(|i| Statement::insert(table, &grade_row(i, "12345678", 1.0)).unwrap())
        .collect()
}
