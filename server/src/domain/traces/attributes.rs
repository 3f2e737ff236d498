//! Attribute codec for OTLP's tagged value union.
//!
//! Converts `AnyValue` and `KeyValue` lists into plain `serde_json` values.
//! The conversion is total: every value shape maps to some JSON value, and
//! attributes without a value are skipped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use serde_json::Value as JsonValue;

/// Convert AnyValue to JSON (preserves native types, bytes become base64)
pub fn any_value_to_json(value: &AnyValue) -> JsonValue {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => serde_json::json!(s),
        Some(any_value::Value::BoolValue(b)) => serde_json::json!(b),
        Some(any_value::Value::IntValue(i)) => serde_json::json!(i),
        Some(any_value::Value::DoubleValue(d)) => serde_json::json!(d),
        Some(any_value::Value::BytesValue(b)) => serde_json::json!(BASE64.encode(b)),
        Some(any_value::Value::ArrayValue(arr)) => {
            serde_json::json!(arr.values.iter().map(any_value_to_json).collect::<Vec<_>>())
        }
        Some(any_value::Value::KvlistValue(kvlist)) => attributes_to_json(&kvlist.values),
        None => JsonValue::Null,
    }
}

/// Build a JSON object from an OTLP attribute list
pub fn attributes_to_json(attrs: &[KeyValue]) -> JsonValue {
    let map: serde_json::Map<String, JsonValue> = attrs
        .iter()
        .filter_map(|kv| {
            kv.value
                .as_ref()
                .map(|v| (kv.key.clone(), any_value_to_json(v)))
        })
        .collect();
    JsonValue::Object(map)
}
