//! Session aggregation queries: overview grouping and timelines.
//!
//! Session key and channel are derived at query time with the same
//! key-path lookup the ingestion deriver uses, rendered as SQL by
//! `session::sql` — backfilled rows resolve through their literal columns,
//! legacy rows through the expression-indexed JSON lookup.

use duckdb::Connection;

use super::execute_count;
use crate::data::StoreError;
use crate::data::models::{SessionOverviewRow, TimelineRow};
use crate::domain::traces::session;

/// Optional filters for the session overview.
#[derive(Debug, Default, Clone)]
pub struct OverviewFilters {
    /// Substring match on the derived session key
    pub q: Option<String>,
    pub channel: Option<String>,
    pub event_type: Option<String>,
    pub from_unix_nano: Option<i64>,
    pub to_unix_nano: Option<i64>,
}

/// Overview result: page rows, total mapped sessions, and the number of
/// spans that resolve to no session key at all.
pub struct OverviewPage {
    pub rows: Vec<SessionOverviewRow>,
    pub total: u64,
    pub unmapped_span_count: u64,
}

fn derived_cte() -> String {
    let skey = session::sql::derived(
        "session_key",
        "attributes",
        "resource_attributes",
        session::SESSION_KEY_KEYS,
    );
    let channel = session::sql::derived(
        "channel",
        "attributes",
        "resource_attributes",
        session::CHANNEL_KEYS,
    );
    format!(
        "SELECT
            {skey} AS session_key,
            {channel} AS channel,
            COALESCE(NULLIF(TRIM(event_type), ''), NULLIF(TRIM(name), '')) AS event_type,
            TRY_CAST(start_time_unix_nano AS BIGINT) AS start_ns,
            TRY_CAST(end_time_unix_nano AS BIGINT) AS end_ns,
            trace_id, span_id
         FROM spans
         WHERE trace_id IS NOT NULL"
    )
}

/// Render the overview filters. `with_q` is false for the unmapped count,
/// which has no session key to search.
fn filter_conditions(filters: &OverviewFilters, with_q: bool) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut bind_values = Vec::new();

    if with_q && let Some(ref q) = filters.q {
        conditions.push("session_key LIKE ?".to_string());
        bind_values.push(format!("%{q}%"));
    }
    if let Some(ref channel) = filters.channel {
        conditions.push("channel = ?".to_string());
        bind_values.push(channel.clone());
    }
    if let Some(ref event_type) = filters.event_type {
        conditions.push("event_type = ?".to_string());
        bind_values.push(event_type.clone());
    }
    if let Some(from) = filters.from_unix_nano {
        conditions.push("start_ns >= ?".to_string());
        bind_values.push(from.to_string());
    }
    if let Some(to) = filters.to_unix_nano {
        conditions.push("start_ns <= ?".to_string());
        bind_values.push(to.to_string());
    }

    let clause = conditions
        .iter()
        .map(|c| format!(" AND {c}"))
        .collect::<Vec<_>>()
        .join("");
    (clause, bind_values)
}

/// Group spans by derived session key and aggregate per session.
pub fn overview(
    conn: &Connection,
    filters: &OverviewFilters,
    limit: i64,
    offset: i64,
) -> Result<OverviewPage, StoreError> {
    let cte = derived_cte();
    let (conds, bind_values) = filter_conditions(filters, true);

    let total = execute_count(
        conn,
        &format!(
            "WITH derived AS ({cte})
             SELECT COUNT(DISTINCT session_key) FROM derived
             WHERE session_key IS NOT NULL{conds}"
        ),
        &bind_values,
    )?;

    let (unmapped_conds, unmapped_binds) = filter_conditions(filters, false);
    let unmapped_span_count = execute_count(
        conn,
        &format!(
            "WITH derived AS ({cte})
             SELECT COUNT(*) FROM derived
             WHERE session_key IS NULL{unmapped_conds}"
        ),
        &unmapped_binds,
    )?;

    let sql = format!(
        "WITH derived AS ({cte})
         SELECT session_key,
                FIRST(channel ORDER BY start_ns) FILTER (WHERE channel IS NOT NULL) AS channel,
                MIN(start_ns) AS first_seen,
                MAX(COALESCE(end_ns, start_ns)) AS last_seen,
                COUNT(*) AS span_count,
                COUNT(DISTINCT trace_id) AS trace_count,
                COALESCE(ARRAY_TO_STRING(LIST_SORT(LIST_DISTINCT(
                    LIST(event_type) FILTER (WHERE event_type IS NOT NULL))), ','), '') AS event_types
         FROM derived
         WHERE session_key IS NOT NULL{conds}
         GROUP BY session_key
         ORDER BY last_seen DESC, session_key
         LIMIT {limit} OFFSET {offset}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn duckdb::ToSql> = bind_values
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let mut query_rows = stmt.query(bind_refs.as_slice())?;

    let mut rows = Vec::new();
    while let Some(row) = query_rows.next()? {
        rows.push(SessionOverviewRow {
            session_key: row.get(0)?,
            channel: row.get(1)?,
            first_seen_unix_nano: row.get(2)?,
            last_seen_unix_nano: row.get(3)?,
            span_count: row.get(4)?,
            trace_count: row.get(5)?,
            event_types: row.get(6)?,
        });
    }

    Ok(OverviewPage {
        rows,
        total,
        unmapped_span_count,
    })
}

/// All spans of one session, ordered by start time then span id.
pub fn timeline(
    conn: &Connection,
    session_key: &str,
    event_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<TimelineRow>, u64), StoreError> {
    let skey = session::sql::derived(
        "session_key",
        "attributes",
        "resource_attributes",
        session::SESSION_KEY_KEYS,
    );
    let channel = session::sql::derived(
        "channel",
        "attributes",
        "resource_attributes",
        session::CHANNEL_KEYS,
    );
    let state = session::sql::derived(
        "state",
        "attributes",
        "resource_attributes",
        session::STATE_KEYS,
    );
    let outcome = session::sql::derived(
        "outcome",
        "attributes",
        "resource_attributes",
        session::OUTCOME_KEYS,
    );

    let cte = format!(
        "SELECT trace_id, span_id, parent_span_id, name,
                start_time_unix_nano, end_time_unix_nano, duration_ns, status_code,
                TRY_CAST(start_time_unix_nano AS BIGINT) AS start_ns,
                {skey} AS session_key,
                {channel} AS channel,
                {state} AS state,
                {outcome} AS outcome,
                COALESCE(NULLIF(TRIM(event_type), ''), NULLIF(TRIM(name), '')) AS event_type,
                COALESCE(NULLIF(TRIM(json_extract_string(resource_attributes, '$.\"service.name\"')), ''), 'unknown') AS service_name
         FROM spans
         WHERE trace_id IS NOT NULL"
    );

    let mut conds = String::from("session_key = ?");
    let mut bind_values = vec![session_key.to_string()];
    if let Some(event_type) = event_type {
        conds.push_str(" AND event_type = ?");
        bind_values.push(event_type.to_string());
    }

    let total = execute_count(
        conn,
        &format!("WITH derived AS ({cte}) SELECT COUNT(*) FROM derived WHERE {conds}"),
        &bind_values,
    )?;

    let sql = format!(
        "WITH derived AS ({cte})
         SELECT trace_id, span_id, parent_span_id, name, event_type,
                start_time_unix_nano, end_time_unix_nano, duration_ns, status_code,
                service_name, channel, state, outcome
         FROM derived
         WHERE {conds}
         ORDER BY start_ns, span_id
         LIMIT {limit} OFFSET {offset}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn duckdb::ToSql> = bind_values
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let mut query_rows = stmt.query(bind_refs.as_slice())?;

    let mut rows = Vec::new();
    while let Some(row) = query_rows.next()? {
        rows.push(TimelineRow {
            trace_id: row.get(0)?,
            span_id: row.get(1)?,
            parent_span_id: row.get(2)?,
            name: row.get(3)?,
            event_type: row.get(4)?,
            start_time_unix_nano: row.get(5)?,
            end_time_unix_nano: row.get(6)?,
            duration_ns: row.get(7)?,
            status_code: row.get(8)?,
            service_name: row.get(9)?,
            channel: row.get(10)?,
            state: row.get(11)?,
            outcome: row.get(12)?,
        });
    }

    Ok((rows, total))
}
