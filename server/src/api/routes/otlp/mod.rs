//! OpenTelemetry Protocol (OTLP) HTTP ingestion endpoints

pub mod encoding;
mod logs;
mod metrics;
mod traces;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;

use crate::api::ApiState;
use crate::core::constants::OTLP_BODY_LIMIT;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/v1/traces", post(traces::export))
        .route("/v1/metrics", post(metrics::export))
        .route("/v1/logs", post(logs::export))
        .layer(DefaultBodyLimit::max(OTLP_BODY_LIMIT))
}
