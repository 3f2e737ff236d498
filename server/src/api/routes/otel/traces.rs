//! Trace listing, detail and export endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::api::types::{ApiError, ListResponse, Pagination};
use crate::core::constants::{LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT};
use crate::data::models::{SpanRow, TraceRow};
use crate::data::repositories::trace;
use crate::domain::traces::depth::compute_depths;
use crate::utils::csv;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Trace listing with per-trace stats and token/service aggregation.
pub async fn list_traces(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListResponse<TraceRow>>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        LIST_DEFAULT_LIMIT,
        LIST_MAX_LIMIT,
    );

    let (items, total) = state
        .store
        .run(move |conn| trace::list_traces(conn, page.limit, page.offset))
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(ListResponse::new(items, page, total)))
}

/// A span within a trace detail page, with its tree position resolved
/// against the returned set.
#[derive(Debug, Serialize)]
pub struct TraceSpanDto {
    #[serde(flatten)]
    pub span: SpanRow,
    pub has_parent: bool,
    pub depth: u32,
}

/// One page of a trace, ordered by start time, with span depths.
pub async fn get_trace(
    State(state): State<ApiState>,
    Path(trace_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListResponse<TraceSpanDto>>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        LIST_DEFAULT_LIMIT,
        LIST_MAX_LIMIT,
    );

    let query_trace_id = trace_id.clone();
    let (spans, total) = state
        .store
        .run(move |conn| trace::get_trace_spans(conn, &query_trace_id, page.limit, page.offset))
        .await
        .map_err(ApiError::from_store)?;

    if total == 0 {
        return Err(ApiError::not_found(
            "TRACE_NOT_FOUND",
            format!("Trace not found: {trace_id}"),
        ));
    }

    let pairs: Vec<(String, Option<String>)> = spans
        .iter()
        .map(|s| (s.span_id.clone().unwrap_or_default(), s.parent_span_id.clone()))
        .collect();
    let depths = compute_depths(&pairs);

    let items = spans
        .into_iter()
        .zip(depths)
        .map(|(span, depth)| TraceSpanDto {
            has_parent: span.parent_span_id.is_some(),
            depth,
            span,
        })
        .collect();

    Ok(Json(ListResponse::new(items, page, total)))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

const CSV_HEADER: &str = "trace_id,span_id,parent_span_id,name,start,end,duration,status_code";

/// Full trace export as JSON or CSV.
pub async fn export_trace(
    State(state): State<ApiState>,
    Path(trace_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let query_trace_id = trace_id.clone();
    let spans = state
        .store
        .run(move |conn| trace::get_all_trace_spans(conn, &query_trace_id))
        .await
        .map_err(ApiError::from_store)?;

    if spans.is_empty() {
        return Err(ApiError::not_found(
            "TRACE_NOT_FOUND",
            format!("Trace not found: {trace_id}"),
        ));
    }

    match query.format.as_deref() {
        Some("csv") => Ok(csv_response(&trace_id, &spans)),
        Some("json") | None => Ok(Json(serde_json::json!({
            "ok": true,
            "trace_id": trace_id,
            "spans": spans,
        }))
        .into_response()),
        Some(other) => Err(ApiError::bad_request(
            "INVALID_FORMAT",
            format!("Unsupported export format: {other}"),
        )),
    }
}

fn csv_response(trace_id: &str, spans: &[SpanRow]) -> Response {
    let mut out = String::with_capacity(spans.len() * 96 + CSV_HEADER.len() + 1);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for span in spans {
        let fields = [
            span.trace_id.clone().unwrap_or_default(),
            span.span_id.clone().unwrap_or_default(),
            span.parent_span_id.clone().unwrap_or_default(),
            span.name.clone().unwrap_or_default(),
            span.start_time_unix_nano.clone().unwrap_or_default(),
            span.end_time_unix_nano.clone().unwrap_or_default(),
            span.duration_ns.map(|d| d.to_string()).unwrap_or_default(),
            span.status_code.map(|c| c.to_string()).unwrap_or_default(),
        ];
        out.push_str(&csv::write_row(&fields));
        out.push('\n');
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"trace-{trace_id}.csv\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    (headers, out).into_response()
}
