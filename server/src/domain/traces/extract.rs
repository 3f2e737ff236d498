//! Span extraction from decoded OTLP trace-export requests.
//!
//! Flattens every span into a row-ready [`SpanRecord`]: hex-encoded ids,
//! normalized status, duration computation and event normalization via the
//! attribute codec.

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::trace::v1::Span;
use serde_json::Value as JsonValue;

use super::attributes::attributes_to_json;
use crate::data::models::SpanRecord;

/// Extract all spans from a decoded trace-export request.
pub fn extract_spans(request: &ExportTraceServiceRequest) -> Vec<SpanRecord> {
    let mut records = Vec::new();

    for resource_spans in &request.resource_spans {
        let resource_attributes = resource_spans
            .resource
            .as_ref()
            .map(|r| attributes_to_json(&r.attributes))
            .unwrap_or_else(|| JsonValue::Object(serde_json::Map::new()));

        for scope_spans in &resource_spans.scope_spans {
            for span in &scope_spans.spans {
                records.push(extract_span(span, resource_attributes.clone()));
            }
        }
    }

    records
}

fn extract_span(span: &Span, resource_attributes: JsonValue) -> SpanRecord {
    let name = if span.name.trim().is_empty() {
        "unknown".to_string()
    } else {
        span.name.clone()
    };

    let start = (span.start_time_unix_nano > 0).then_some(span.start_time_unix_nano);
    let end = (span.end_time_unix_nano > 0).then_some(span.end_time_unix_nano);
    let duration_ns = match (start, end) {
        (Some(s), Some(e)) if e >= s => Some(i64::try_from(e - s).unwrap_or(i64::MAX)),
        _ => None,
    };

    let status = span.status.as_ref().map(|st| {
        serde_json::json!({
            "code": st.code,
            "message": st.message,
        })
    });

    let events: Vec<JsonValue> = span
        .events
        .iter()
        .map(|e| {
            serde_json::json!({
                "name": e.name,
                "timeUnixNano": (e.time_unix_nano > 0).then(|| e.time_unix_nano.to_string()),
                "attributes": attributes_to_json(&e.attributes),
            })
        })
        .collect();

    SpanRecord {
        trace_id: Some(hex::encode(&span.trace_id)),
        span_id: Some(hex::encode(&span.span_id)),
        parent_span_id: if span.parent_span_id.is_empty() {
            None
        } else {
            Some(hex::encode(&span.parent_span_id))
        },
        name: Some(name),
        kind: Some(span.kind),
        start_time_unix_nano: start.map(|n| n.to_string()),
        end_time_unix_nano: end.map(|n| n.to_string()),
        duration_ns,
        status_code: span.status.as_ref().map(|st| st.code),
        status,
        attributes: attributes_to_json(&span.attributes),
        resource_attributes,
        events: JsonValue::Array(events),
        derived: Default::default(),
    }
}
