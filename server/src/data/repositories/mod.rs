//! Store repositories: hand-built parametrized queries per table/view

pub mod session;
pub mod signal;
pub mod span;
pub mod trace;

use duckdb::Connection;

use super::error::StoreError;

/// Run a count query with string bind values.
pub(crate) fn execute_count(
    conn: &Connection,
    sql: &str,
    bind_values: &[String],
) -> Result<u64, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let params: Vec<&dyn duckdb::ToSql> = bind_values
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let count: i64 = stmt.query_row(params.as_slice(), |row| row.get(0))?;
    Ok(count as u64)
}
