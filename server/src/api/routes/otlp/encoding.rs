//! OTLP content-type negotiation and response encoding.
//!
//! Supports both protobuf (application/x-protobuf) and JSON
//! (application/json) per the OpenTelemetry Protocol specification.
//! Request decoding lives in the ingestion pipeline, which owns the
//! content-level error handling; this module picks the encoding from the
//! headers and mirrors it onto the response.

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use prost::Message;
use serde::Serialize;

use crate::domain::ingest::OtlpContentType;

/// Parse content type from HTTP headers.
/// Defaults to protobuf if content type is missing or unrecognized.
#[inline]
pub fn content_type_from_headers(headers: &HeaderMap) -> OtlpContentType {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        OtlpContentType::Json
    } else {
        OtlpContentType::Protobuf
    }
}

fn encode_response<T>(response: &T, content_type: OtlpContentType) -> Result<Vec<u8>, String>
where
    T: Message + Serialize,
{
    match content_type {
        OtlpContentType::Protobuf => Ok(response.encode_to_vec()),
        OtlpContentType::Json => {
            // Unset message fields are omitted, not null, per OTLP/JSON:
            // a fully-successful export answers with a bare `{}`.
            let mut value = serde_json::to_value(response).map_err(|e| e.to_string())?;
            if let Some(obj) = value.as_object_mut() {
                obj.retain(|_, v| !v.is_null());
            }
            serde_json::to_vec(&value).map_err(|e| e.to_string())
        }
    }
}

/// Create an OTLP export response with the request's content type.
pub fn success_response<T>(response: &T, content_type: OtlpContentType) -> Response
where
    T: Message + Serialize,
{
    match encode_response(response, content_type) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type.as_header_value())],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode OTLP response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                "Internal server error",
            )
                .into_response()
        }
    }
}

/// 500 response for storage failures during ingestion.
pub fn storage_error_response(e: crate::data::StoreError) -> Response {
    tracing::error!(error = %e, "Ingestion storage failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain")],
        "Internal server error",
    )
        .into_response()
}
