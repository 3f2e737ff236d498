//! Metric/log ingest summaries and record listings

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::api::types::{ApiError, ListResponse, Pagination, parse_i64_param};
use crate::core::constants::{INGEST_SUMMARY_RECENT, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT};
use crate::data::models::{SignalIngestSummary, SignalKind, SignalRow};
use crate::data::repositories::signal::{self, RecordFilters};

#[derive(Debug, Serialize)]
pub struct IngestSummaryResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub summary: SignalIngestSummary,
}

async fn ingest_summary(
    state: &ApiState,
    kind: SignalKind,
) -> Result<Json<IngestSummaryResponse>, ApiError> {
    let summary = state
        .store
        .run(move |conn| signal::ingest_summary(conn, kind, INGEST_SUMMARY_RECENT))
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(IngestSummaryResponse { ok: true, summary }))
}

pub async fn metrics_ingest_summary(
    State(state): State<ApiState>,
) -> Result<Json<IngestSummaryResponse>, ApiError> {
    ingest_summary(&state, SignalKind::Metrics).await
}

pub async fn logs_ingest_summary(
    State(state): State<ApiState>,
) -> Result<Json<IngestSummaryResponse>, ApiError> {
    ingest_summary(&state, SignalKind::Logs).await
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// Millisecond epoch bounds on the received timestamp
    pub from: Option<String>,
    pub to: Option<String>,
    pub service: Option<String>,
    #[serde(rename = "sessionKey")]
    pub session_key: Option<String>,
    #[serde(rename = "parseStatus")]
    pub parse_status: Option<String>,
    /// Metrics only
    #[serde(rename = "metricName")]
    pub metric_name: Option<String>,
    /// Logs only
    pub severity: Option<String>,
}

async fn list_records(
    state: &ApiState,
    kind: SignalKind,
    query: RecordsQuery,
) -> Result<Json<ListResponse<SignalRow>>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        LIST_DEFAULT_LIMIT,
        LIST_MAX_LIMIT,
    );

    let filters = RecordFilters {
        from_unix_millis: parse_i64_param(query.from.as_deref()),
        to_unix_millis: parse_i64_param(query.to.as_deref()),
        service_name: query.service.filter(|s| !s.trim().is_empty()),
        session_key: query.session_key.filter(|s| !s.trim().is_empty()),
        parse_status: query.parse_status.filter(|s| !s.trim().is_empty()),
        metric_name: query.metric_name.filter(|s| !s.trim().is_empty()),
        severity: query.severity.filter(|s| !s.trim().is_empty()),
    };

    let (items, total) = state
        .store
        .run(move |conn| signal::list_records(conn, kind, &filters, page.limit, page.offset))
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(ListResponse::new(items, page, total)))
}

pub async fn metrics_records(
    State(state): State<ApiState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ListResponse<SignalRow>>, ApiError> {
    list_records(&state, SignalKind::Metrics, query).await
}

pub async fn logs_records(
    State(state): State<ApiState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ListResponse<SignalRow>>, ApiError> {
    list_records(&state, SignalKind::Logs, query).await
}
