//! Traces export endpoint

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTracePartialSuccess, ExportTraceServiceResponse,
};

use super::encoding::{content_type_from_headers, storage_error_response, success_response};
use crate::api::ApiState;
use crate::domain::ingest;

pub async fn export(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = content_type_from_headers(&headers);

    let outcome =
        match ingest::ingest_trace_request(&state.store, content_type, body.to_vec()).await {
            Ok(outcome) => outcome,
            Err(e) => return storage_error_response(e),
        };

    let response = ExportTraceServiceResponse {
        partial_success: if outcome.is_clean() {
            None
        } else {
            Some(ExportTracePartialSuccess {
                rejected_spans: outcome.rejected,
                error_message: outcome.message,
            })
        },
    };
    success_response(&response, content_type)
}
