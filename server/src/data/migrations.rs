//! Schema initialization and additive migration.
//!
//! Safe to run on every startup against a live store: tables are created if
//! absent, missing columns are added (never dropped or renamed), and the
//! hardening indexes are created if absent.

use duckdb::Connection;

use super::error::StoreError;
use super::schema::{self, TableSpec};

/// Create tables, add any missing columns, create indexes.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let start = std::time::Instant::now();

    for table in schema::TABLES {
        conn.execute_batch(&schema::create_table_sql(table))
            .map_err(|e| StoreError::migration_failed(format!("create_{}", table.name), e))?;
        ensure_columns(conn, table)?;
    }

    for statement in schema::index_statements() {
        conn.execute_batch(&statement)
            .map_err(|e| StoreError::migration_failed("create_indexes", e))?;
    }

    tracing::debug!("Schema ensured in {}ms", start.elapsed().as_millis());
    Ok(())
}

/// Add any column present in the schema definition but absent from the
/// live table.
fn ensure_columns(conn: &Connection, table: &TableSpec) -> Result<(), StoreError> {
    let existing = existing_columns(conn, table.name)?;

    for column in table.columns {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column.name)) {
            continue;
        }
        tracing::debug!(table = table.name, column = column.name, "Adding missing column");
        conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            table.name, column.name, column.decl
        ))
        .map_err(|e| {
            StoreError::migration_failed(format!("add_{}_{}", table.name, column.name), e)
        })?;
    }

    Ok(())
}

fn existing_columns(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT column_name FROM information_schema.columns WHERE table_name = ?")?;
    let mut rows = stmt.query([table])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(0)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory database");
        conn.execute_batch("LOAD json;").expect("json extension");
        conn
    }

    #[test]
    fn test_run_migrations_fresh_database() {
        let conn = create_test_db();
        run_migrations(&conn).expect("migrations should succeed on fresh database");

        for table in schema::TABLES {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| {
                    row.get(0)
                })
                .expect("table should exist");
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = create_test_db();
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run should also succeed");
    }

    #[test]
    fn test_missing_column_added_additively() {
        let conn = create_test_db();
        // An old store created before the derived columns existed.
        conn.execute_batch(
            "CREATE TABLE spans (
                trace_id VARCHAR,
                span_id VARCHAR,
                payload BLOB
            );",
        )
        .expect("legacy table");
        conn.execute_batch("INSERT INTO spans (trace_id, span_id) VALUES ('t1', 's1');")
            .expect("legacy row");

        run_migrations(&conn).expect("migrations against legacy table");

        // Legacy row survives with the new columns readable as NULL.
        let session_key: Option<String> = conn
            .query_row(
                "SELECT session_key FROM spans WHERE trace_id = 't1'",
                [],
                |row| row.get(0),
            )
            .expect("new column readable");
        assert_eq!(session_key, None);
    }

    #[test]
    fn test_expression_indexes_created() {
        let conn = create_test_db();
        run_migrations(&conn).expect("migrations");

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM duckdb_indexes() WHERE index_name LIKE 'idx_spans_%'",
                [],
                |row| row.get(0),
            )
            .expect("index catalog");
        assert!(count >= 5, "expected span indexes, found {count}");
    }
}
