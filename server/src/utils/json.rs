//! JSON utility functions

use serde_json::Value as JsonValue;

/// Converts a JsonValue to Option<String>, returning None for null values.
///
/// This prevents serializing `JsonValue::Null` as the string `"null"`,
/// which would be stored as a VARCHAR instead of a database NULL.
pub fn json_to_opt_string(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        serde_json::to_string(value).ok()
    }
}

/// Parse a stored JSON column into an object, treating NULL and malformed
/// JSON as an empty mapping. Non-object JSON is also coerced to empty.
pub fn parse_object_or_empty(raw: Option<&str>) -> JsonValue {
    match raw.and_then(|s| serde_json::from_str::<JsonValue>(s).ok()) {
        Some(v @ JsonValue::Object(_)) => v,
        _ => JsonValue::Object(serde_json::Map::new()),
    }
}

/// Parse a stored JSON column into any value, treating NULL and malformed
/// JSON as JSON null.
pub fn parse_or_null(raw: Option<&str>) -> JsonValue {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_returns_none() {
        assert_eq!(json_to_opt_string(&JsonValue::Null), None);
    }

    #[test]
    fn test_object_returns_json_string() {
        let value = json!({"key": "value"});
        assert_eq!(
            json_to_opt_string(&value),
            Some(r#"{"key":"value"}"#.to_string())
        );
    }

    #[test]
    fn test_parse_object_or_empty_valid() {
        let value = parse_object_or_empty(Some(r#"{"a": 1}"#));
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_parse_object_or_empty_malformed() {
        let value = parse_object_or_empty(Some("{not json"));
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_parse_object_or_empty_null() {
        assert_eq!(parse_object_or_empty(None), json!({}));
    }

    #[test]
    fn test_parse_object_or_empty_non_object() {
        assert_eq!(parse_object_or_empty(Some("[1,2]")), json!({}));
    }

    #[test]
    fn test_parse_or_null_malformed() {
        assert_eq!(parse_or_null(Some("{oops")), JsonValue::Null);
    }

    #[test]
    fn test_parse_or_null_array() {
        assert_eq!(parse_or_null(Some("[1,2]")), json!([1, 2]));
    }
}
