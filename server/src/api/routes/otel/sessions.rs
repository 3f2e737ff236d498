//! Session overview and timeline endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::api::types::{ApiError, ListResponse, Pagination, PaginationMeta, parse_i64_param};
use crate::core::constants::{
    OVERVIEW_DEFAULT_LIMIT, OVERVIEW_MAX_LIMIT, TIMELINE_DEFAULT_LIMIT, TIMELINE_MAX_LIMIT,
};
use crate::data::models::{SessionOverviewRow, TimelineRow};
use crate::data::repositories::session::{self, OverviewFilters};
use crate::utils::time::millis_to_nanos;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub q: Option<String>,
    pub channel: Option<String>,
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    /// Millisecond epoch bounds, converted to nanoseconds for filtering
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OverviewMeta {
    pub unmapped_span_count: u64,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub ok: bool,
    pub items: Vec<SessionOverviewRow>,
    pub pagination: PaginationMeta,
    pub meta: OverviewMeta,
}

/// Spans grouped by derived session key.
pub async fn overview(
    State(state): State<ApiState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        OVERVIEW_DEFAULT_LIMIT,
        OVERVIEW_MAX_LIMIT,
    );

    let filters = OverviewFilters {
        q: query.q.filter(|s| !s.trim().is_empty()),
        channel: query.channel.filter(|s| !s.trim().is_empty()),
        event_type: query.event_type.filter(|s| !s.trim().is_empty()),
        from_unix_nano: parse_i64_param(query.from.as_deref()).map(millis_to_nanos),
        to_unix_nano: parse_i64_param(query.to.as_deref()).map(millis_to_nanos),
    };

    let result = state
        .store
        .run(move |conn| session::overview(conn, &filters, page.limit, page.offset))
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(OverviewResponse {
        ok: true,
        items: result.rows,
        pagination: PaginationMeta {
            offset: page.offset,
            limit: page.limit,
            total: result.total,
        },
        meta: OverviewMeta {
            unmapped_span_count: result.unmapped_span_count,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
}

/// All spans for one session key, ordered by start time.
pub async fn timeline(
    State(state): State<ApiState>,
    Path(session_key): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<ListResponse<TimelineRow>>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        TIMELINE_DEFAULT_LIMIT,
        TIMELINE_MAX_LIMIT,
    );

    let event_type = query.event_type.filter(|s| !s.trim().is_empty());
    let (items, total) = state
        .store
        .run(move |conn| {
            session::timeline(
                conn,
                &session_key,
                event_type.as_deref(),
                page.limit,
                page.offset,
            )
        })
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(ListResponse::new(items, page, total)))
}
