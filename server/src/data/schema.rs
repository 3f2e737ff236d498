//! Store schema definitions.
//!
//! Append-only tables with no PRIMARY KEY constraints. The column lists
//! below are the single source of truth: table creation and the additive
//! column migration both render from them, so a column added here reaches
//! existing stores on the next startup without touching existing data.

use crate::domain::traces::session;

/// One column: name + type/default declaration.
pub struct Column {
    pub name: &'static str,
    pub decl: &'static str,
}

pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
}

const fn col(name: &'static str, decl: &'static str) -> Column {
    Column { name, decl }
}

/// Span storage: one row per decoded span, or one all-null placeholder row
/// per rejected/unparseable trace-ingest call. The raw request body is
/// retained on every row.
pub const SPANS: TableSpec = TableSpec {
    name: "spans",
    columns: &[
        col("trace_id", "VARCHAR"),
        col("span_id", "VARCHAR"),
        col("parent_span_id", "VARCHAR"),
        col("name", "VARCHAR"),
        col("kind", "INTEGER"),
        // Unix nanos kept as decimal strings to preserve the full 64-bit
        // range; aggregations TRY_CAST so comparisons stay numeric.
        col("start_time_unix_nano", "VARCHAR"),
        col("end_time_unix_nano", "VARCHAR"),
        col("duration_ns", "BIGINT"),
        col("status_code", "INTEGER"),
        col("status", "JSON"),
        col("attributes", "JSON"),
        col("resource_attributes", "JSON"),
        col("events", "JSON"),
        col("payload", "BLOB"),
        col("received_at", "TIMESTAMP DEFAULT (now())"),
        // Derived columns, null until populated by ingestion or backfill
        col("event_type", "VARCHAR"),
        col("session_key", "VARCHAR"),
        col("session_id", "VARCHAR"),
        col("channel", "VARCHAR"),
        col("state", "VARCHAR"),
        col("outcome", "VARCHAR"),
    ],
};

/// Metric payload summaries: one row per metrics-export call.
pub const METRIC_PAYLOADS: TableSpec = TableSpec {
    name: "metric_payloads",
    columns: &[
        col("content_type", "VARCHAR"),
        col("payload", "BLOB"),
        col("parse_status", "VARCHAR"),
        col("parse_error", "VARCHAR"),
        col("item_count", "BIGINT DEFAULT 0"),
        col("service_name", "VARCHAR"),
        col("session_key", "VARCHAR"),
        col("metric_names", "JSON"),
        col("received_at", "TIMESTAMP DEFAULT (now())"),
    ],
};

/// Log payload summaries: one row per logs-export call.
pub const LOG_PAYLOADS: TableSpec = TableSpec {
    name: "log_payloads",
    columns: &[
        col("content_type", "VARCHAR"),
        col("payload", "BLOB"),
        col("parse_status", "VARCHAR"),
        col("parse_error", "VARCHAR"),
        col("item_count", "BIGINT DEFAULT 0"),
        col("service_name", "VARCHAR"),
        col("session_key", "VARCHAR"),
        col("severity_text", "VARCHAR"),
        col("severity_number", "INTEGER"),
        col("received_at", "TIMESTAMP DEFAULT (now())"),
    ],
};

pub const TABLES: &[&TableSpec] = &[&SPANS, &METRIC_PAYLOADS, &LOG_PAYLOADS];

/// Render `CREATE TABLE IF NOT EXISTS` for a table spec.
pub fn create_table_sql(table: &TableSpec) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {} {}", c.name, c.decl))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        table.name,
        columns.join(",\n")
    )
}

/// Names of the hardening indexes (used by the benchmark harness to drop
/// and re-create them).
pub const HARDENING_INDEX_NAMES: &[&str] = &[
    "idx_spans_trace",
    "idx_spans_received",
    "idx_spans_start",
    "idx_spans_session",
    "idx_spans_channel",
    "idx_spans_session_expr",
    "idx_spans_channel_expr",
    "idx_metric_payloads_received",
    "idx_metric_payloads_session",
    "idx_log_payloads_received",
    "idx_log_payloads_session",
];

/// `CREATE INDEX IF NOT EXISTS` statements for every hardening index.
///
/// Literal-column indexes serve rows whose derived columns are populated;
/// the expression indexes compute the same session/channel lookup from raw
/// attribute JSON and cover rows that have not been backfilled yet.
pub fn index_statements() -> Vec<String> {
    let session_expr =
        session::sql::json_lookup("attributes", "resource_attributes", session::SESSION_KEY_KEYS);
    let channel_expr =
        session::sql::json_lookup("attributes", "resource_attributes", session::CHANNEL_KEYS);

    vec![
        "CREATE INDEX IF NOT EXISTS idx_spans_trace ON spans(trace_id);".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_spans_received ON spans(received_at);".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_spans_start ON spans(start_time_unix_nano);".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_spans_session ON spans(session_key);".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_spans_channel ON spans(channel);".to_string(),
        format!("CREATE INDEX IF NOT EXISTS idx_spans_session_expr ON spans(({session_expr}));"),
        format!("CREATE INDEX IF NOT EXISTS idx_spans_channel_expr ON spans(({channel_expr}));"),
        "CREATE INDEX IF NOT EXISTS idx_metric_payloads_received ON metric_payloads(received_at);"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_metric_payloads_session ON metric_payloads(session_key);"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_log_payloads_received ON log_payloads(received_at);"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_log_payloads_session ON log_payloads(session_key);"
            .to_string(),
    ]
}
