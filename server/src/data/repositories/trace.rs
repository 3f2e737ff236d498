//! Trace aggregation queries: listing with per-page enrichment, ordered
//! detail pages and full-trace export sets.

use std::collections::HashMap;

use duckdb::{Connection, params};

use super::execute_count;
use super::span::{SPAN_SELECT_COLUMNS, row_to_span};
use crate::data::StoreError;
use crate::data::models::{SpanRow, TraceRow};
use crate::utils::time::micros_to_datetime;

const INPUT_TOKENS_ATTR: &str = "gen_ai.usage.input_tokens";
const OUTPUT_TOKENS_ATTR: &str = "gen_ai.usage.output_tokens";
const SERVICE_NAME_ATTR: &str = "service.name";
const UNKNOWN_ROOT: &str = "(unknown root)";
const UNKNOWN_SERVICE: &str = "unknown";

/// Per-trace stats straight out of the grouping query, before the
/// page-only join-back enrichment.
struct TraceStats {
    trace_id: String,
    span_count: i64,
    start_ns: Option<i64>,
    end_ns: Option<i64>,
    first_received_micros: i64,
    last_received_micros: i64,
}

/// List traces, most recently received first.
///
/// Strategy: group spans by trace id and page the groups, then join back to
/// the spans of the returned page only for token sums, service names and
/// root-span names. The total is counted independently over all distinct
/// trace ids.
pub fn list_traces(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<TraceRow>, u64), StoreError> {
    let total = execute_count(
        conn,
        "SELECT COUNT(DISTINCT trace_id) FROM spans WHERE trace_id IS NOT NULL",
        &[],
    )?;

    let mut stats = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT trace_id,
                    COUNT(*) AS span_count,
                    MIN(TRY_CAST(start_time_unix_nano AS BIGINT)) AS start_ns,
                    MAX(TRY_CAST(end_time_unix_nano AS BIGINT)) AS end_ns,
                    EPOCH_US(MIN(received_at)) AS first_received,
                    EPOCH_US(MAX(received_at)) AS last_received
             FROM spans
             WHERE trace_id IS NOT NULL
             GROUP BY trace_id
             ORDER BY last_received DESC, trace_id
             LIMIT ? OFFSET ?",
        )?;
        let mut rows = stmt.query(params![limit, offset])?;
        while let Some(row) = rows.next()? {
            stats.push(TraceStats {
                trace_id: row.get(0)?,
                span_count: row.get(1)?,
                start_ns: row.get(2)?,
                end_ns: row.get(3)?,
                first_received_micros: row.get(4)?,
                last_received_micros: row.get(5)?,
            });
        }
    }

    if stats.is_empty() {
        return Ok((Vec::new(), total));
    }

    let enrichment = enrich_page(conn, &stats)?;

    let traces = stats
        .into_iter()
        .map(|s| {
            let e = enrichment.get(&s.trace_id);
            let duration_ns = match (s.start_ns, s.end_ns) {
                (Some(start), Some(end)) if end >= start => Some(end - start),
                _ => None,
            };
            TraceRow {
                root_name: e
                    .and_then(|e| e.root_name.clone())
                    .unwrap_or_else(|| UNKNOWN_ROOT.to_string()),
                span_count: s.span_count,
                start_time_unix_nano: s.start_ns,
                end_time_unix_nano: s.end_ns,
                duration_ns,
                first_received_at: micros_to_datetime(s.first_received_micros),
                last_received_at: micros_to_datetime(s.last_received_micros),
                input_tokens: e.map(|e| e.input_tokens).unwrap_or(0),
                output_tokens: e.map(|e| e.output_tokens).unwrap_or(0),
                service_name: e
                    .and_then(|e| e.services.first().cloned())
                    .unwrap_or_else(|| UNKNOWN_SERVICE.to_string()),
                services: e.map(|e| e.services.clone()).unwrap_or_default(),
                trace_id: s.trace_id,
            }
        })
        .collect();

    Ok((traces, total))
}

#[derive(Default)]
struct TraceEnrichment {
    input_tokens: i64,
    output_tokens: i64,
    services: Vec<String>,
    /// Name of the earliest parentless span
    root_name: Option<String>,
    root_start_ns: Option<i64>,
}

/// Join back to the spans of the paged trace ids and fold token usage,
/// service names and root-span candidates per trace.
fn enrich_page(
    conn: &Connection,
    stats: &[TraceStats],
) -> Result<HashMap<String, TraceEnrichment>, StoreError> {
    let placeholders: Vec<&str> = stats.iter().map(|_| "?").collect();
    let sql = format!(
        "SELECT trace_id, parent_span_id, name,
                TRY_CAST(start_time_unix_nano AS BIGINT) AS start_ns,
                TRY_CAST(json_extract_string(attributes, '$.\"{INPUT_TOKENS_ATTR}\"') AS BIGINT),
                TRY_CAST(json_extract_string(attributes, '$.\"{OUTPUT_TOKENS_ATTR}\"') AS BIGINT),
                json_extract_string(resource_attributes, '$.\"{SERVICE_NAME_ATTR}\"')
         FROM spans
         WHERE trace_id IN ({})",
        placeholders.join(", ")
    );

    let bind_values: Vec<String> = stats.iter().map(|s| s.trace_id.clone()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn duckdb::ToSql> = bind_values
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let mut rows = stmt.query(bind_refs.as_slice())?;

    let mut enrichment: HashMap<String, TraceEnrichment> = HashMap::with_capacity(stats.len());
    while let Some(row) = rows.next()? {
        let trace_id: String = row.get(0)?;
        let parent_span_id: Option<String> = row.get(1)?;
        let name: Option<String> = row.get(2)?;
        let start_ns: Option<i64> = row.get(3)?;
        let input_tokens: Option<i64> = row.get(4)?;
        let output_tokens: Option<i64> = row.get(5)?;
        let service: Option<String> = row.get(6)?;

        let entry = enrichment.entry(trace_id).or_default();
        entry.input_tokens += input_tokens.unwrap_or(0);
        entry.output_tokens += output_tokens.unwrap_or(0);

        if let Some(service) = service.filter(|s| !s.is_empty())
            && !entry.services.contains(&service)
        {
            entry.services.push(service);
        }

        if parent_span_id.is_none() {
            let is_earlier = match (start_ns, entry.root_start_ns) {
                (_, None) => entry.root_name.is_none(),
                (Some(s), Some(best)) => s < best,
                (None, Some(_)) => false,
            };
            if is_earlier || entry.root_name.is_none() {
                entry.root_name = name;
                entry.root_start_ns = start_ns;
            }
        }
    }

    Ok(enrichment)
}

/// One page of spans for a trace, ordered by start time then span id.
pub fn get_trace_spans(
    conn: &Connection,
    trace_id: &str,
    limit: i64,
    offset: i64,
) -> Result<(Vec<SpanRow>, u64), StoreError> {
    let total = execute_count(
        conn,
        "SELECT COUNT(*) FROM spans WHERE trace_id = ?",
        &[trace_id.to_string()],
    )?;

    let sql = format!(
        "SELECT {SPAN_SELECT_COLUMNS} FROM spans
         WHERE trace_id = ?
         ORDER BY TRY_CAST(start_time_unix_nano AS BIGINT), span_id
         LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![trace_id, limit, offset])?;

    let mut spans = Vec::new();
    while let Some(row) = rows.next()? {
        spans.push(row_to_span(row)?);
    }

    Ok((spans, total))
}

/// The full ordered span set of one trace, for export.
pub fn get_all_trace_spans(conn: &Connection, trace_id: &str) -> Result<Vec<SpanRow>, StoreError> {
    let sql = format!(
        "SELECT {SPAN_SELECT_COLUMNS} FROM spans
         WHERE trace_id = ?
         ORDER BY TRY_CAST(start_time_unix_nano AS BIGINT), span_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![trace_id])?;

    let mut spans = Vec::new();
    while let Some(row) = rows.next()? {
        spans.push(row_to_span(row)?);
    }

    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Store;
    use crate::data::models::SpanRecord;
    use crate::data::repositories::span::insert_batch;
    use serde_json::json;

    fn record(trace_id: &str, span_id: &str, parent: Option<&str>, start: i64) -> SpanRecord {
        SpanRecord {
            trace_id: Some(trace_id.to_string()),
            span_id: Some(span_id.to_string()),
            parent_span_id: parent.map(|p| p.to_string()),
            name: Some(format!("span-{span_id}")),
            start_time_unix_nano: Some(start.to_string()),
            end_time_unix_nano: Some((start + 500).to_string()),
            duration_ns: Some(500),
            attributes: json!({}),
            resource_attributes: json!({"service.name": "agent-host"}),
            events: json!([]),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_traces_groups_and_counts() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_batch(
            &conn,
            &[
                record("t1", "a", None, 1000),
                record("t1", "b", Some("a"), 1100),
                record("t2", "c", None, 2000),
            ],
            b"",
        )
        .expect("insert");

        let (traces, total) = list_traces(&conn, 10, 0).expect("list");
        assert_eq!(total, 2);
        assert_eq!(traces.len(), 2);
        let t1 = traces.iter().find(|t| t.trace_id == "t1").unwrap();
        assert_eq!(t1.span_count, 2);
        assert_eq!(t1.root_name, "span-a");
        assert_eq!(t1.start_time_unix_nano, Some(1000));
        assert_eq!(t1.end_time_unix_nano, Some(1600));
        assert_eq!(t1.duration_ns, Some(600));
        assert_eq!(t1.service_name, "agent-host");
    }

    #[test]
    fn test_list_traces_token_sums_from_attributes() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        let mut a = record("t1", "a", None, 1000);
        a.attributes = json!({"gen_ai.usage.input_tokens": 100, "gen_ai.usage.output_tokens": 20});
        let mut b = record("t1", "b", Some("a"), 1100);
        b.attributes = json!({"gen_ai.usage.input_tokens": "50"});
        insert_batch(&conn, &[a, b], b"").expect("insert");

        let (traces, _) = list_traces(&conn, 10, 0).expect("list");
        assert_eq!(traces[0].input_tokens, 150);
        assert_eq!(traces[0].output_tokens, 20);
    }

    #[test]
    fn test_list_traces_unknown_root_when_all_have_parents() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_batch(&conn, &[record("t1", "a", Some("gone"), 1000)], b"").expect("insert");

        let (traces, _) = list_traces(&conn, 10, 0).expect("list");
        assert_eq!(traces[0].root_name, "(unknown root)");
    }

    #[test]
    fn test_list_traces_null_duration_when_end_missing() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        let mut a = record("t1", "a", None, 1000);
        a.end_time_unix_nano = None;
        a.duration_ns = None;
        insert_batch(&conn, &[a], b"").expect("insert");

        let (traces, _) = list_traces(&conn, 10, 0).expect("list");
        assert_eq!(traces[0].duration_ns, None);
    }

    #[test]
    fn test_list_traces_excludes_placeholder_rows() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        crate::data::repositories::span::insert_placeholder(&conn, b"junk").expect("placeholder");
        insert_batch(&conn, &[record("t1", "a", None, 1000)], b"").expect("insert");

        let (traces, total) = list_traces(&conn, 10, 0).expect("list");
        assert_eq!(total, 1);
        assert_eq!(traces.len(), 1);
    }

    #[test]
    fn test_get_trace_spans_ordered_by_start() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_batch(
            &conn,
            &[
                record("t1", "late", None, 5000),
                record("t1", "early", None, 1000),
            ],
            b"",
        )
        .expect("insert");

        let (spans, total) = get_trace_spans(&conn, "t1", 10, 0).expect("detail");
        assert_eq!(total, 2);
        assert_eq!(spans[0].span_id.as_deref(), Some("early"));
        assert_eq!(spans[1].span_id.as_deref(), Some("late"));
    }

    #[test]
    fn test_get_all_trace_spans_full_set() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        let records: Vec<SpanRecord> = (0..7)
            .map(|i| record("t1", &format!("s{i}"), None, 1000 + i))
            .collect();
        insert_batch(&conn, &records, b"").expect("insert");

        let spans = get_all_trace_spans(&conn, "t1").expect("export set");
        assert_eq!(spans.len(), 7);
    }

    #[test]
    fn test_list_traces_pagination() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        for i in 0..5 {
            insert_batch(&conn, &[record(&format!("t{i}"), "s", None, 1000)], b"")
                .expect("insert");
        }

        let (page, total) = list_traces(&conn, 2, 0).expect("page 1");
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        let (page2, _) = list_traces(&conn, 2, 4).expect("page 3");
        assert_eq!(page2.len(), 1);
    }
}
