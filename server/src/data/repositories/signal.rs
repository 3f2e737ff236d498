//! Signal payload repository: metric/log summary rows, ingest totals and
//! filterable record listings.

use duckdb::{Connection, Row, params};

use super::execute_count;
use crate::data::StoreError;
use crate::data::models::{SignalIngestSummary, SignalKind, SignalRecord, SignalRow};
use crate::utils::json::parse_or_null;
use crate::utils::time::micros_to_datetime;

/// Persist one summary row for an ingest call (ok or error).
pub fn insert_signal(
    conn: &Connection,
    kind: SignalKind,
    record: &SignalRecord,
) -> Result<(), StoreError> {
    match kind {
        SignalKind::Metrics => {
            let metric_names = record
                .metric_names
                .as_ref()
                .and_then(|names| serde_json::to_string(names).ok());
            conn.execute(
                "INSERT INTO metric_payloads (
                    content_type, payload, parse_status, parse_error,
                    item_count, service_name, session_key, metric_names
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.content_type,
                    record.payload,
                    record.parse_status.as_str(),
                    record.parse_error,
                    record.item_count,
                    record.service_name,
                    record.session_key,
                    metric_names,
                ],
            )?;
        }
        SignalKind::Logs => {
            conn.execute(
                "INSERT INTO log_payloads (
                    content_type, payload, parse_status, parse_error,
                    item_count, service_name, session_key, severity_text, severity_number
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.content_type,
                    record.payload,
                    record.parse_status.as_str(),
                    record.parse_error,
                    record.item_count,
                    record.service_name,
                    record.session_key,
                    record.severity_text,
                    record.severity_number,
                ],
            )?;
        }
    }
    Ok(())
}

fn select_columns(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Metrics => {
            "content_type, parse_status, parse_error, item_count, service_name, session_key, \
             metric_names::VARCHAR, NULL, NULL, EPOCH_US(received_at)"
        }
        SignalKind::Logs => {
            "content_type, parse_status, parse_error, item_count, service_name, session_key, \
             NULL, severity_text, severity_number, EPOCH_US(received_at)"
        }
    }
}

fn row_to_signal(row: &Row<'_>, kind: SignalKind) -> Result<SignalRow, StoreError> {
    let metric_names: Option<String> = row.get(6)?;
    let received_at_micros: Option<i64> = row.get(9)?;

    Ok(SignalRow {
        content_type: row.get(0)?,
        parse_status: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        parse_error: row.get(2)?,
        item_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        service_name: row.get(4)?,
        session_key: row.get(5)?,
        metric_names: match kind {
            SignalKind::Metrics => Some(parse_or_null(metric_names.as_deref())),
            SignalKind::Logs => None,
        },
        severity_text: row.get(7)?,
        severity_number: row.get(8)?,
        received_at: micros_to_datetime(received_at_micros.unwrap_or(0)),
    })
}

/// Totals plus the 10 most recent rows for the ingest-summary endpoint.
pub fn ingest_summary(
    conn: &Connection,
    kind: SignalKind,
    recent_limit: i64,
) -> Result<SignalIngestSummary, StoreError> {
    let table = kind.table();

    let (total_count, error_count, last_received_micros): (i64, i64, Option<i64>) = conn
        .query_row(
            &format!(
                "SELECT COUNT(*),
                        COUNT(*) FILTER (WHERE parse_status = 'error'),
                        EPOCH_US(MAX(received_at))
                 FROM {table}"
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

    let sql = format!(
        "SELECT {} FROM {table} ORDER BY received_at DESC, rowid DESC LIMIT ?",
        select_columns(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![recent_limit])?;
    let mut recent = Vec::new();
    while let Some(row) = rows.next()? {
        recent.push(row_to_signal(row, kind)?);
    }

    Ok(SignalIngestSummary {
        total_count,
        error_count,
        last_received_at: last_received_micros.map(micros_to_datetime),
        recent,
    })
}

/// Optional filters for the record listing.
#[derive(Debug, Default, Clone)]
pub struct RecordFilters {
    pub from_unix_millis: Option<i64>,
    pub to_unix_millis: Option<i64>,
    pub service_name: Option<String>,
    pub session_key: Option<String>,
    pub parse_status: Option<String>,
    /// Metrics only: calls whose payload carried this metric name
    pub metric_name: Option<String>,
    /// Logs only: exact severity text
    pub severity: Option<String>,
}

/// Filterable signal-record listing, newest first.
pub fn list_records(
    conn: &Connection,
    kind: SignalKind,
    filters: &RecordFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<SignalRow>, u64), StoreError> {
    let table = kind.table();
    let mut conditions = vec!["1 = 1".to_string()];
    let mut bind_values: Vec<String> = Vec::new();

    if let Some(from) = filters.from_unix_millis {
        conditions.push("EPOCH_MS(received_at) >= ?".to_string());
        bind_values.push(from.to_string());
    }
    if let Some(to) = filters.to_unix_millis {
        conditions.push("EPOCH_MS(received_at) <= ?".to_string());
        bind_values.push(to.to_string());
    }
    if let Some(ref service) = filters.service_name {
        conditions.push("service_name = ?".to_string());
        bind_values.push(service.clone());
    }
    if let Some(ref session_key) = filters.session_key {
        conditions.push("session_key = ?".to_string());
        bind_values.push(session_key.clone());
    }
    if let Some(ref status) = filters.parse_status {
        conditions.push("parse_status = ?".to_string());
        bind_values.push(status.clone());
    }
    if kind == SignalKind::Metrics && let Some(ref name) = filters.metric_name {
        conditions.push("metric_names IS NOT NULL AND list_contains(metric_names::VARCHAR[], ?)".to_string());
        bind_values.push(name.clone());
    }
    if kind == SignalKind::Logs && let Some(ref severity) = filters.severity {
        conditions.push("severity_text = ?".to_string());
        bind_values.push(severity.clone());
    }

    let where_clause = conditions.join(" AND ");

    let total = execute_count(
        conn,
        &format!("SELECT COUNT(*) FROM {table} WHERE {where_clause}"),
        &bind_values,
    )?;

    let sql = format!(
        "SELECT {} FROM {table} WHERE {where_clause}
         ORDER BY received_at DESC, rowid DESC
         LIMIT {limit} OFFSET {offset}",
        select_columns(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn duckdb::ToSql> = bind_values
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let mut query_rows = stmt.query(bind_refs.as_slice())?;

    let mut rows = Vec::new();
    while let Some(row) = query_rows.next()? {
        rows.push(row_to_signal(row, kind)?);
    }

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Store;
    use crate::data::models::ParseStatus;

    fn metric_record(session_key: Option<&str>, names: &[&str]) -> SignalRecord {
        SignalRecord {
            content_type: "application/x-protobuf".to_string(),
            payload: b"payload".to_vec(),
            parse_status: ParseStatus::Ok,
            item_count: names.len() as i64,
            service_name: Some("agent-host".to_string()),
            session_key: session_key.map(|s| s.to_string()),
            metric_names: Some(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        }
    }

    fn error_record() -> SignalRecord {
        SignalRecord {
            content_type: "application/x-protobuf".to_string(),
            payload: b"garbage".to_vec(),
            parse_status: ParseStatus::Error,
            parse_error: Some("Invalid protobuf payload".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_summary() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_signal(&conn, SignalKind::Metrics, &metric_record(Some("sk"), &["m1"]))
            .expect("ok row");
        insert_signal(&conn, SignalKind::Metrics, &error_record()).expect("error row");

        let summary = ingest_summary(&conn, SignalKind::Metrics, 10).expect("summary");
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.error_count, 1);
        assert!(summary.last_received_at.is_some());
        assert_eq!(summary.recent.len(), 2);
    }

    #[test]
    fn test_summary_recent_is_capped() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        for i in 0..15 {
            insert_signal(
                &conn,
                SignalKind::Logs,
                &SignalRecord {
                    content_type: "application/json".to_string(),
                    item_count: i,
                    ..Default::default()
                },
            )
            .expect("insert");
        }

        let summary = ingest_summary(&conn, SignalKind::Logs, 10).expect("summary");
        assert_eq!(summary.total_count, 15);
        assert_eq!(summary.recent.len(), 10);
    }

    #[test]
    fn test_list_records_parse_status_filter() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_signal(&conn, SignalKind::Metrics, &metric_record(None, &["m1"])).expect("ok");
        insert_signal(&conn, SignalKind::Metrics, &error_record()).expect("error");

        let (rows, total) = list_records(
            &conn,
            SignalKind::Metrics,
            &RecordFilters {
                parse_status: Some("error".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .expect("list");
        assert_eq!(total, 1);
        assert_eq!(rows[0].parse_status, "error");
        assert_eq!(rows[0].parse_error.as_deref(), Some("Invalid protobuf payload"));
    }

    #[test]
    fn test_list_records_metric_name_filter() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_signal(&conn, SignalKind::Metrics, &metric_record(None, &["tokens", "latency"]))
            .expect("first");
        insert_signal(&conn, SignalKind::Metrics, &metric_record(None, &["errors"]))
            .expect("second");

        let (rows, total) = list_records(
            &conn,
            SignalKind::Metrics,
            &RecordFilters {
                metric_name: Some("latency".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .expect("list");
        assert_eq!(total, 1);
        assert_eq!(
            rows[0].metric_names,
            Some(serde_json::json!(["tokens", "latency"]))
        );
    }

    #[test]
    fn test_list_records_session_filter() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_signal(&conn, SignalKind::Metrics, &metric_record(Some("sk-1"), &["m"]))
            .expect("first");
        insert_signal(&conn, SignalKind::Metrics, &metric_record(Some("sk-2"), &["m"]))
            .expect("second");

        let (rows, total) = list_records(
            &conn,
            SignalKind::Metrics,
            &RecordFilters {
                session_key: Some("sk-2".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .expect("list");
        assert_eq!(total, 1);
        assert_eq!(rows[0].session_key.as_deref(), Some("sk-2"));
    }

    #[test]
    fn test_list_records_severity_filter() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn();
        insert_signal(
            &conn,
            SignalKind::Logs,
            &SignalRecord {
                severity_text: Some("ERROR".to_string()),
                severity_number: Some(17),
                ..Default::default()
            },
        )
        .expect("error log");
        insert_signal(
            &conn,
            SignalKind::Logs,
            &SignalRecord {
                severity_text: Some("INFO".to_string()),
                severity_number: Some(9),
                ..Default::default()
            },
        )
        .expect("info log");

        let (rows, total) = list_records(
            &conn,
            SignalKind::Logs,
            &RecordFilters {
                severity: Some("ERROR".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .expect("list");
        assert_eq!(total, 1);
        assert_eq!(rows[0].severity_number, Some(17));
    }
}
