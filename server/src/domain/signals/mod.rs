//! Metric and log payload summarization.
//!
//! Signals are persisted as one summary row per ingest call rather than one
//! row per data point; these modules compute the item counts and the
//! service/session/severity summaries stored on that row.

pub mod logs;
pub mod metrics;

use serde_json::Value as JsonValue;

use super::traces::session;

pub(crate) const SERVICE_NAME_KEY: &str = "service.name";

/// Track the first non-empty service name and session key seen while
/// walking resource and data-point attributes.
#[derive(Debug, Default)]
pub(crate) struct ContextSummary {
    pub service_name: Option<String>,
    pub session_key: Option<String>,
}

impl ContextSummary {
    pub(crate) fn observe(&mut self, attributes: &JsonValue) {
        if self.service_name.is_none() {
            self.service_name =
                session::lookup(attributes, &JsonValue::Null, &[SERVICE_NAME_KEY]);
        }
        if self.session_key.is_none() {
            self.session_key =
                session::lookup(attributes, &JsonValue::Null, session::SESSION_KEY_KEYS);
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.service_name.is_some() && self.session_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_values_win() {
        let mut ctx = ContextSummary::default();
        ctx.observe(&json!({"service.name": "first"}));
        ctx.observe(&json!({"service.name": "second", "openclaw.sessionKey": "sk"}));
        assert_eq!(ctx.service_name.as_deref(), Some("first"));
        assert_eq!(ctx.session_key.as_deref(), Some("sk"));
        assert!(ctx.is_complete());
    }

    #[test]
    fn test_empty_values_skipped() {
        let mut ctx = ContextSummary::default();
        ctx.observe(&json!({"service.name": "  "}));
        assert_eq!(ctx.service_name, None);
    }
}
