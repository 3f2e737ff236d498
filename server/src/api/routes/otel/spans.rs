//! Raw span listing

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::api::ApiState;
use crate::api::types::{ApiError, ListResponse, Pagination};
use crate::core::constants::{LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT};
use crate::data::models::SpanRow;
use crate::data::repositories::span;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Raw span page, newest first.
pub async fn list_spans(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListResponse<SpanRow>>, ApiError> {
    let page = Pagination::from_query(
        query.limit.as_deref(),
        query.offset.as_deref(),
        LIST_DEFAULT_LIMIT,
        LIST_MAX_LIMIT,
    );

    let (items, total) = state
        .store
        .run(move |conn| span::list_spans(conn, page.limit, page.offset))
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(ListResponse::new(items, page, total)))
}
