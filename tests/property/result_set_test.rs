// tests/property/result_set_test.rs

//! Property-based tests for parsing the server's table rendering

use oshinodb_client::core::protocol::ResultSet;
use proptest::prelude::*;

fn render(columns: &[String], rows: &[Vec<String>]) -> String {
    let rule = format!("+{}\n", "----------+".repeat(columns.len()));
    let line = |cells: &[String]| {
        let padded: Vec<String> = cells.iter().map(|c| format!("{c:>8}")).collect();
        format!("| {} |\n", padded.join(" | "))
    };
    let mut out = String::new();
    out.push_str(&rule);
    out.push_str(&line(columns));
    out.push_str(&rule);
    for row in rows {
        out.push_str(&line(row));
    }
    out.push_str(&rule);
    out.push_str(&format!("Total record(s): {}\n", rows.len()));
    out
}

proptest! {
    #[test]
    fn test_rendered_table_parses_back(
        (columns, rows) in (1usize..=5).prop_flat_map(|width| (
            prop::collection::vec("[a-z_]{1,8}", width),
            prop::collection::vec(prop::collection::vec("[a-zA-Z0-9.]{1,8}", width), 0..=20),
        ))
    ) {
        let rs = ResultSet::parse(&render(&columns, &rows)).unwrap();
        prop_assert_eq!(rs.columns(), &columns[..]);
        prop_assert_eq!(rs.rows(), &rows[..]);
    }
}
