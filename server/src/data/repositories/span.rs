//! Span repository: transactional batch insert, placeholder rows for
//! rejected ingest calls, and the raw span listing.

use duckdb::{Connection, Row, params};

use crate::data::models::{SpanRecord, SpanRow};
use crate::data::{StoreError, in_transaction};
use crate::utils::json::{json_to_opt_string, parse_object_or_empty, parse_or_null};
use crate::utils::time::micros_to_datetime;

/// Column list shared by every span SELECT so `row_to_span` stays in sync.
pub(crate) const SPAN_SELECT_COLUMNS: &str = "trace_id, span_id, parent_span_id, name, kind, \
     start_time_unix_nano, end_time_unix_nano, duration_ns, \
     status_code, status::VARCHAR, attributes::VARCHAR, resource_attributes::VARCHAR, \
     events::VARCHAR, event_type, session_key, session_id, channel, state, outcome, \
     EPOCH_US(received_at)";

/// Insert one row per record, all inside a single transaction. Any failure
/// rolls the whole batch back. The raw request body is stored on every row.
pub fn insert_batch(
    conn: &Connection,
    records: &[SpanRecord],
    payload: &[u8],
) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }

    in_transaction(conn, |conn| {
        let mut stmt = conn.prepare(
            "INSERT INTO spans (
                trace_id, span_id, parent_span_id, name, kind,
                start_time_unix_nano, end_time_unix_nano, duration_ns,
                status_code, status, attributes, resource_attributes, events, payload,
                event_type, session_key, session_id, channel, state, outcome
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;

        for record in records {
            stmt.execute(params![
                record.trace_id,
                record.span_id,
                record.parent_span_id,
                record.name,
                record.kind,
                record.start_time_unix_nano,
                record.end_time_unix_nano,
                record.duration_ns,
                record.status_code,
                record.status.as_ref().and_then(json_to_opt_string),
                json_to_opt_string(&record.attributes),
                json_to_opt_string(&record.resource_attributes),
                json_to_opt_string(&record.events),
                payload,
                record.derived.event_type,
                record.derived.session_key,
                record.derived.session_id,
                record.derived.channel,
                record.derived.state,
                record.derived.outcome,
            ])?;
        }

        Ok(())
    })
}

/// Persist one all-null placeholder row carrying only the raw payload.
/// Written for undecodable protobuf bodies and for valid-but-empty
/// payloads, so no ingest call is silently dropped.
pub fn insert_placeholder(conn: &Connection, payload: &[u8]) -> Result<(), StoreError> {
    conn.execute("INSERT INTO spans (payload) VALUES (?)", params![payload])?;
    Ok(())
}

/// Raw span page, newest first.
pub fn list_spans(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<SpanRow>, u64), StoreError> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM spans", [], |row| row.get(0))?;

    let sql = format!(
        "SELECT {SPAN_SELECT_COLUMNS} FROM spans
         ORDER BY received_at DESC, rowid DESC
         LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![limit, offset])?;

    let mut spans = Vec::new();
    while let Some(row) = rows.next()? {
        spans.push(row_to_span(row)?);
    }

    Ok((spans, total as u64))
}

/// Map a row selected with [`SPAN_SELECT_COLUMNS`].
///
/// Malformed JSON in stored columns reads as an empty mapping (attributes)
/// or JSON null (status/events), never as an error.
pub(crate) fn row_to_span(row: &Row<'_>) -> Result<SpanRow, StoreError> {
    let status: Option<String> = row.get(9)?;
    let attributes: Option<String> = row.get(10)?;
    let resource_attributes: Option<String> = row.get(11)?;
    let events: Option<String> = row.get(12)?;
    // Rows older than the received_at column read as NULL.
    let received_at_micros: Option<i64> = row.get(19)?;

    Ok(SpanRow {
        trace_id: row.get(0)?,
        span_id: row.get(1)?,
        parent_span_id: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        start_time_unix_nano: row.get(5)?,
        end_time_unix_nano: row.get(6)?,
        duration_ns: row.get(7)?,
        status_code: row.get(8)?,
        status: parse_or_null(status.as_deref()),
        attributes: parse_object_or_empty(attributes.as_deref()),
        resource_attributes: parse_object_or_empty(resource_attributes.as_deref()),
        events: parse_or_null(events.as_deref()),
        event_type: row.get(13)?,
        session_key: row.get(14)?,
        session_id: row.get(15)?,
        channel: row.get(16)?,
        state: row.get(17)?,
        outcome: row.get(18)?,
        received_at: micros_to_datetime(received_at_micros.unwrap_or(0)),
    })
}
