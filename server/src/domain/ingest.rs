//! Ingestion pipeline: decode, extract, derive, persist.
//!
//! Runs to completion on the request task. Decode failures are
//! content-level outcomes reported through OTLP partial-success, never
//! faults; only storage failures propagate as errors (after the
//! transaction has rolled back).

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;

use crate::data::models::{ParseStatus, SignalKind, SignalRecord};
use crate::data::repositories::{signal, span};
use crate::data::{Store, StoreError};
use crate::domain::signals::{logs, metrics};
use crate::domain::traces::extract::extract_spans;
use crate::domain::traces::session::derive_fields;

const INVALID_PROTOBUF: &str = "Invalid protobuf payload";
const INVALID_JSON: &str = "Invalid JSON payload";
const NO_SPANS: &str = "No valid spans found in payload";

/// Request body encoding, per the OTLP/HTTP convention: `application/json`
/// means OTLP/JSON, anything else is treated as protobuf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpContentType {
    Protobuf,
    Json,
}

impl OtlpContentType {
    #[inline]
    pub fn as_header_value(self) -> &'static str {
        match self {
            OtlpContentType::Protobuf => "application/x-protobuf",
            OtlpContentType::Json => "application/json",
        }
    }
}

/// Outcome of one ingest call, in OTLP partial-success terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub rejected: i64,
    pub message: String,
}

impl IngestOutcome {
    fn accepted() -> Self {
        Self {
            rejected: 0,
            message: String::new(),
        }
    }

    fn partial(rejected: i64, message: &str) -> Self {
        Self {
            rejected,
            message: message.to_string(),
        }
    }

    /// True when the response should omit `partialSuccess` entirely.
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.message.is_empty()
    }
}

/// Ingest one trace-export call.
///
/// - undecodable protobuf: one placeholder row (raw payload retained),
///   reported as one rejected span;
/// - unparsable JSON: nothing persisted, one rejected span;
/// - zero spans: one placeholder row, zero rejected (valid-but-empty);
/// - otherwise one row per span inside a single transaction.
pub async fn ingest_trace_request(
    store: &Arc<Store>,
    content_type: OtlpContentType,
    body: Vec<u8>,
) -> Result<IngestOutcome, StoreError> {
    let request = match content_type {
        OtlpContentType::Protobuf => match ExportTraceServiceRequest::decode(body.as_slice()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable trace protobuf, persisting placeholder");
                store
                    .run(move |conn| span::insert_placeholder(conn, &body))
                    .await?;
                return Ok(IngestOutcome::partial(1, INVALID_PROTOBUF));
            }
        },
        OtlpContentType::Json => match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable trace JSON");
                return Ok(IngestOutcome::partial(1, INVALID_JSON));
            }
        },
    };

    let mut records = extract_spans(&request);
    if records.is_empty() {
        store
            .run(move |conn| span::insert_placeholder(conn, &body))
            .await?;
        return Ok(IngestOutcome::partial(0, NO_SPANS));
    }

    for record in &mut records {
        record.derived = derive_fields(
            record.name.as_deref(),
            &record.attributes,
            &record.resource_attributes,
        );
    }

    let span_count = records.len();
    store
        .run(move |conn| span::insert_batch(conn, &records, &body))
        .await?;
    tracing::debug!(spans = span_count, "Trace batch persisted");

    Ok(IngestOutcome::accepted())
}

/// Ingest one metrics-export call. Exactly one summary row is persisted
/// whether decoding succeeds or fails.
pub async fn ingest_metrics_request(
    store: &Arc<Store>,
    content_type: OtlpContentType,
    body: Vec<u8>,
) -> Result<IngestOutcome, StoreError> {
    let decoded: Result<ExportMetricsServiceRequest, &'static str> = decode_signal(content_type, &body);

    let (record, outcome) = match decoded {
        Ok(request) => {
            let summary = metrics::summarize(&request);
            (
                SignalRecord {
                    content_type: content_type.as_header_value().to_string(),
                    payload: body,
                    parse_status: ParseStatus::Ok,
                    item_count: summary.item_count,
                    service_name: summary.service_name,
                    session_key: summary.session_key,
                    metric_names: Some(summary.metric_names),
                    ..Default::default()
                },
                IngestOutcome::accepted(),
            )
        }
        Err(message) => (
            error_record(content_type, body, message),
            IngestOutcome::partial(1, message),
        ),
    };

    store
        .run(move |conn| signal::insert_signal(conn, SignalKind::Metrics, &record))
        .await?;
    Ok(outcome)
}

/// Ingest one logs-export call. Exactly one summary row is persisted
/// whether decoding succeeds or fails.
pub async fn ingest_logs_request(
    store: &Arc<Store>,
    content_type: OtlpContentType,
    body: Vec<u8>,
) -> Result<IngestOutcome, StoreError> {
    let decoded: Result<ExportLogsServiceRequest, &'static str> = decode_signal(content_type, &body);

    let (record, outcome) = match decoded {
        Ok(request) => {
            let summary = logs::summarize(&request);
            (
                SignalRecord {
                    content_type: content_type.as_header_value().to_string(),
                    payload: body,
                    parse_status: ParseStatus::Ok,
                    item_count: summary.item_count,
                    service_name: summary.service_name,
                    session_key: summary.session_key,
                    severity_text: summary.severity_text,
                    severity_number: summary.severity_number,
                    ..Default::default()
                },
                IngestOutcome::accepted(),
            )
        }
        Err(message) => (
            error_record(content_type, body, message),
            IngestOutcome::partial(1, message),
        ),
    };

    store
        .run(move |conn| signal::insert_signal(conn, SignalKind::Logs, &record))
        .await?;
    Ok(outcome)
}

fn decode_signal<T>(content_type: OtlpContentType, body: &[u8]) -> Result<T, &'static str>
where
    T: Message + Default + serde::de::DeserializeOwned,
{
    match content_type {
        OtlpContentType::Protobuf => T::decode(body).map_err(|e| {
            tracing::warn!(error = %e, "Undecodable signal protobuf");
            INVALID_PROTOBUF
        }),
        OtlpContentType::Json => serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(error = %e, "Unparsable signal JSON");
            INVALID_JSON
        }),
    }
}

fn error_record(content_type: OtlpContentType, body: Vec<u8>, message: &str) -> SignalRecord {
    SignalRecord {
        content_type: content_type.as_header_value().to_string(),
        payload: body,
        parse_status: ParseStatus::Error,
        parse_error: Some(message.to_string()),
        ..Default::default()
    }
}
