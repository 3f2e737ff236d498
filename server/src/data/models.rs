//! Row-ready records and typed query results

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::traces::session::DerivedFields;

/// A span ready for insertion. All identity fields are optional: a record
/// with no trace/span id is a placeholder for a rejected or empty ingest
/// call (the raw payload is still persisted alongside it).
#[derive(Debug, Clone, Default)]
pub struct SpanRecord {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<i32>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub duration_ns: Option<i64>,
    pub status_code: Option<i32>,
    pub status: Option<JsonValue>,
    pub attributes: JsonValue,
    pub resource_attributes: JsonValue,
    pub events: JsonValue,
    pub derived: DerivedFields,
}

/// Which signal table a summary row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Metrics,
    Logs,
}

impl SignalKind {
    pub const fn table(&self) -> &'static str {
        match self {
            SignalKind::Metrics => "metric_payloads",
            SignalKind::Logs => "log_payloads",
        }
    }
}

/// One signal-payload summary row (metrics or logs), ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct SignalRecord {
    pub content_type: String,
    pub payload: Vec<u8>,
    pub parse_status: ParseStatus,
    pub parse_error: Option<String>,
    pub item_count: i64,
    pub service_name: Option<String>,
    pub session_key: Option<String>,
    /// Metrics only
    pub metric_names: Option<Vec<String>>,
    /// Logs only
    pub severity_text: Option<String>,
    pub severity_number: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    #[default]
    Ok,
    Error,
}

impl ParseStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Ok => "ok",
            ParseStatus::Error => "error",
        }
    }
}

/// A stored span as returned by the query layer.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRow {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<i32>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub duration_ns: Option<i64>,
    pub status_code: Option<i32>,
    pub status: JsonValue,
    pub attributes: JsonValue,
    pub resource_attributes: JsonValue,
    pub events: JsonValue,
    pub event_type: Option<String>,
    pub session_key: Option<String>,
    pub session_id: Option<String>,
    pub channel: Option<String>,
    pub state: Option<String>,
    pub outcome: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// One row of the trace listing.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRow {
    pub trace_id: String,
    pub root_name: String,
    pub span_count: i64,
    pub start_time_unix_nano: Option<i64>,
    pub end_time_unix_nano: Option<i64>,
    pub duration_ns: Option<i64>,
    pub first_received_at: DateTime<Utc>,
    pub last_received_at: DateTime<Utc>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub service_name: String,
    pub services: Vec<String>,
}

/// One row of the session overview.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOverviewRow {
    pub session_key: String,
    pub channel: Option<String>,
    pub first_seen_unix_nano: Option<i64>,
    pub last_seen_unix_nano: Option<i64>,
    pub span_count: i64,
    pub trace_count: i64,
    /// Distinct event-type names, comma-joined and sorted
    pub event_types: String,
}

/// One row of a session timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineRow {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub name: Option<String>,
    pub event_type: Option<String>,
    pub start_time_unix_nano: Option<String>,
    pub end_time_unix_nano: Option<String>,
    pub duration_ns: Option<i64>,
    pub status_code: Option<i32>,
    pub service_name: String,
    pub channel: Option<String>,
    pub state: Option<String>,
    pub outcome: Option<String>,
}

/// A stored signal-payload summary as returned by the query layer.
#[derive(Debug, Clone, Serialize)]
pub struct SignalRow {
    pub content_type: Option<String>,
    pub parse_status: String,
    pub parse_error: Option<String>,
    pub item_count: i64,
    pub service_name: Option<String>,
    pub session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_names: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_number: Option<i32>,
    pub received_at: DateTime<Utc>,
}

/// Aggregate totals for a signal table.
#[derive(Debug, Clone, Serialize)]
pub struct SignalIngestSummary {
    pub total_count: i64,
    pub error_count: i64,
    pub last_received_at: Option<DateTime<Utc>>,
    pub recent: Vec<SignalRow>,
}
