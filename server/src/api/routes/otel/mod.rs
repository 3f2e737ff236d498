//! Query API endpoints backed by the aggregation engine

mod sessions;
mod signals;
mod spans;
mod traces;

use axum::Router;
use axum::routing::get;

use crate::api::ApiState;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/spans", get(spans::list_spans))
        .route("/api/traces", get(traces::list_traces))
        .route("/api/traces/{trace_id}", get(traces::get_trace))
        .route("/api/traces/{trace_id}/export", get(traces::export_trace))
        .route("/api/sessions/overview", get(sessions::overview))
        .route(
            "/api/sessions/{session_key}/timeline",
            get(sessions::timeline),
        )
        .route(
            "/api/metrics/ingest-summary",
            get(signals::metrics_ingest_summary),
        )
        .route("/api/logs/ingest-summary", get(signals::logs_ingest_summary))
        .route("/api/metrics/records", get(signals::metrics_records))
        .route("/api/logs/records", get(signals::logs_records))
}
