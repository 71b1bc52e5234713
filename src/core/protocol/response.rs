// src/core/protocol/response.rs

//! The client-side view of a server response and a parser for its tabular
//! rendering of query results.

use bytes::Bytes;

/// The bytes returned for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    body: Bytes,
    truncated: bool,
}

impl Response {
    pub fn new(body: Bytes, truncated: bool) -> Self {
        Self { body, truncated }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// True when an unframed read filled its whole buffer, i.e. the server may
    /// have sent more than was received.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// The response decoded as text with any trailing NUL padding removed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body)
            .trim_end_matches('\0')
            .to_string()
    }

    /// Parses the response as a result table. `None` if it is not one.
    pub fn result_set(&self) -> Option<ResultSet> {
        ResultSet::parse(&self.text())
    }
}

/// A query result as rendered by the server:
///
/// ```text
/// +------+----------+-----------+
/// |   id |     name |     score |
/// +------+----------+-----------+
/// |    2 | xiaoming | 95.000000 |
/// +------+----------+-----------+
/// Total record(s): 1
/// ```
///
/// Rule lines and the record-count footer are ignored. The first `|` line is
/// the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn parse(text: &str) -> Option<Self> {
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for line in text.lines().map(str::trim) {
            if !line.starts_with('|') {
                continue;
            }
            let cells: Vec<String> = line
                .trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect();
            if columns.is_none() {
                columns = Some(cells);
            } else {
                rows.push(cells);
            }
        }

        columns.map(|columns| Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Rows whose `column` equals `value`. Numeric cells compare numerically,
    /// so `2` matches `2.000000`.
    pub fn rows_where(&self, column: &str, value: &str) -> Vec<&[String]> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|row| row.get(idx).is_some_and(|cell| cells_equal(cell, value)))
            .map(Vec::as_slice)
            .collect()
    }

    /// The `column` cell of the first row whose `key_column` equals `key`.
    pub fn lookup(&self, key_column: &str, key: &str, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows_where(key_column, key)
            .first()
            .and_then(|row| row.get(idx))
            .map(String::as_str)
    }

    /// Like `lookup`, parsed as a float.
    pub fn lookup_f64(&self, key_column: &str, key: &str, column: &str) -> Option<f64> {
        self.lookup(key_column, key, column)?.parse().ok()
    }
}

fn cells_equal(cell: &str, value: &str) -> bool {
    if cell == value {
        return true;
    }
    match (cell.parse::<f64>(), value.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
