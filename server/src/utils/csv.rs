//! Minimal CSV writing helpers for trace export.
//!
//! Fields containing a quote, comma or newline are quoted, with internal
//! quotes doubled.

/// Escape a single CSV field.
pub fn escape_field(field: &str) -> String {
    if field.contains('"') || field.contains(',') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render one CSV row from already-stringified fields.
pub fn write_row(fields: &[String]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    escaped.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field_unquoted() {
        assert_eq!(escape_field("hello"), "hello");
    }

    #[test]
    fn test_comma_field_quoted() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
    }

    #[test]
    fn test_quote_field_doubled() {
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_newline_field_quoted() {
        assert_eq!(escape_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_write_row() {
        let row = write_row(&["a".to_string(), "b,c".to_string(), "d".to_string()]);
        assert_eq!(row, "a,\"b,c\",d");
    }
}
