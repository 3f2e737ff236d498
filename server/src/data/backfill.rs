//! Bounded-batch backfill of derived span columns.
//!
//! Rows written before the derived columns existed carry NULLs there; this
//! recomputes them from the stored attribute JSON, at most `limit` rows per
//! call, one transaction per batch, so an operator can migrate a live store
//! incrementally without long write locks.

use duckdb::{Connection, params};

use super::error::StoreError;
use super::in_transaction;
use crate::domain::traces::session::derive_fields;
use crate::utils::json::parse_object_or_empty;

/// Backfill up to `limit` span rows whose derived columns are unpopulated.
/// Returns the number of rows updated; 0 when nothing is pending or when
/// `limit <= 0`.
///
/// `event_type` doubles as the migration marker: it is written non-null
/// (possibly empty) for every processed row, while session fields may
/// legitimately derive to NULL.
pub fn backfill_derived_span_columns(conn: &Connection, limit: i64) -> Result<u64, StoreError> {
    if limit <= 0 {
        return Ok(0);
    }

    in_transaction(conn, |conn| {
        let mut pending: Vec<(i64, Option<String>, Option<String>, Option<String>)> = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT rowid, name, attributes::VARCHAR, resource_attributes::VARCHAR
                 FROM spans
                 WHERE trace_id IS NOT NULL AND event_type IS NULL
                 ORDER BY rowid
                 LIMIT ?",
            )?;
            let mut rows = stmt.query([limit])?;
            while let Some(row) = rows.next()? {
                pending.push((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?));
            }
        }

        if pending.is_empty() {
            return Ok(0);
        }

        let mut update = conn.prepare(
            "UPDATE spans
             SET event_type = ?, session_key = ?, session_id = ?, channel = ?, state = ?, outcome = ?
             WHERE rowid = ?",
        )?;
        for (rowid, name, attributes, resource_attributes) in &pending {
            let attributes = parse_object_or_empty(attributes.as_deref());
            let resource_attributes = parse_object_or_empty(resource_attributes.as_deref());
            let derived = derive_fields(name.as_deref(), &attributes, &resource_attributes);

            update.execute(params![
                derived.event_type.unwrap_or_default(),
                derived.session_key,
                derived.session_id,
                derived.channel,
                derived.state,
                derived.outcome,
                rowid,
            ])?;
        }

        Ok(pending.len() as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Store;

    fn insert_legacy_span(conn: &Connection, trace_id: &str, span_id: &str, attributes: &str) {
        conn.execute(
            "INSERT INTO spans (trace_id, span_id, name, attributes, resource_attributes)
             VALUES (?, ?, 'agent.turn', ?, '{}')",
            params![trace_id, span_id, attributes],
        )
        .expect("insert legacy span");
    }

    #[test]
    fn test_backfill_updates_one_row_then_zero() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_legacy_span(&conn, "t1", "s1", r#"{"openclaw.sessionKey": "sk-1"}"#);

        assert_eq!(backfill_derived_span_columns(&conn, 1).expect("first"), 1);
        assert_eq!(backfill_derived_span_columns(&conn, 1).expect("second"), 0);

        let (session_key, event_type): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT session_key, event_type FROM spans WHERE trace_id = 't1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("row");
        assert_eq!(session_key.as_deref(), Some("sk-1"));
        assert_eq!(event_type.as_deref(), Some("agent.turn"));
    }

    #[test]
    fn test_backfill_respects_limit() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        for i in 0..5 {
            insert_legacy_span(&conn, &format!("t{i}"), "s", "{}");
        }

        assert_eq!(backfill_derived_span_columns(&conn, 3).expect("batch"), 3);
        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("rest"), 2);
        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("done"), 0);
    }

    #[test]
    fn test_backfill_zero_limit_is_noop() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_legacy_span(&conn, "t1", "s1", "{}");

        assert_eq!(backfill_derived_span_columns(&conn, 0).expect("zero"), 0);
        assert_eq!(backfill_derived_span_columns(&conn, -5).expect("negative"), 0);
    }

    #[test]
    fn test_backfill_skips_placeholder_rows() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        conn.execute("INSERT INTO spans (payload) VALUES ('raw')", [])
            .expect("placeholder row");

        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("run"), 0);
    }

    #[test]
    fn test_backfill_null_session_row_not_reselected() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        // No session attributes at all: session_key stays NULL but the row
        // must still count as migrated.
        insert_legacy_span(&conn, "t1", "s1", r#"{"other": "attr"}"#);

        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("first"), 1);
        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("second"), 0);
    }

    #[test]
    fn test_backfill_malformed_attributes_treated_as_empty() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        // Malformed JSON cannot enter through ingestion, but a VARCHAR
        // column in a legacy store could hold anything.
        conn.execute(
            "INSERT INTO spans (trace_id, span_id, name) VALUES ('t1', 's1', 'turn')",
            [],
        )
        .expect("row without attributes");

        assert_eq!(backfill_derived_span_columns(&conn, 10).expect("run"), 1);
        let session_key: Option<String> = conn
            .query_row("SELECT session_key FROM spans", [], |row| row.get(0))
            .expect("row");
        assert_eq!(session_key, None);
    }
}
