//! Session field derivation.
//!
//! Agent runtimes report session identity, channel, state and outcome as
//! free-form attributes under the `openclaw.*` namespace (with bare-key
//! fallbacks from older plugins). Each field resolves through an ordered
//! key list, trying span attributes first and resource attributes second,
//! taking the first trimmed non-empty value.
//!
//! The key lists below are the single source of truth: `derive_fields`
//! walks them in Rust at ingestion/backfill time, and the `sql` submodule
//! renders the identical lookup as a SQL expression for query-time
//! derivation and for the expression indexes covering rows that have not
//! been backfilled yet.

use serde_json::Value as JsonValue;

/// Key fallback chains, in priority order.
pub const SESSION_KEY_KEYS: &[&str] = &["openclaw.sessionKey", "openclaw.sessionId"];
pub const SESSION_ID_KEYS: &[&str] = &["openclaw.sessionId"];
pub const CHANNEL_KEYS: &[&str] = &["openclaw.channel", "channel"];
pub const STATE_KEYS: &[&str] = &["openclaw.state", "state"];
pub const OUTCOME_KEYS: &[&str] = &["openclaw.outcome", "outcome"];

/// Fields derived from raw attribute JSON at ingestion or backfill time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFields {
    pub event_type: Option<String>,
    pub session_key: Option<String>,
    pub session_id: Option<String>,
    pub channel: Option<String>,
    pub state: Option<String>,
    pub outcome: Option<String>,
}

/// Derive all session fields for one span.
///
/// `event_type` is the trimmed span name (kept even when empty so a
/// processed row is distinguishable from an unmigrated one).
pub fn derive_fields(
    name: Option<&str>,
    attributes: &JsonValue,
    resource_attributes: &JsonValue,
) -> DerivedFields {
    DerivedFields {
        event_type: name.map(|n| n.trim().to_string()),
        session_key: lookup(attributes, resource_attributes, SESSION_KEY_KEYS),
        session_id: lookup(attributes, resource_attributes, SESSION_ID_KEYS),
        channel: lookup(attributes, resource_attributes, CHANNEL_KEYS),
        state: lookup(attributes, resource_attributes, STATE_KEYS),
        outcome: lookup(attributes, resource_attributes, OUTCOME_KEYS),
    }
}

/// Resolve one field: every key against `attributes`, then every key
/// against `resource_attributes`, first trimmed non-empty value wins.
/// Non-object inputs behave as empty mappings.
pub fn lookup(
    attributes: &JsonValue,
    resource_attributes: &JsonValue,
    keys: &[&str],
) -> Option<String> {
    for source in [attributes, resource_attributes] {
        let Some(map) = source.as_object() else {
            continue;
        };
        for key in keys {
            if let Some(value) = map.get(*key)
                && let Some(s) = value_as_trimmed_string(value)
            {
                return Some(s);
            }
        }
    }
    None
}

/// Scalar values coerce to their string form, matching what
/// `json_extract_string` yields on the SQL side. Objects and arrays do not
/// name a session.
fn value_as_trimmed_string(value: &JsonValue) -> Option<String> {
    let s = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        _ => return None,
    };
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// SQL renderings of the same key lists.
pub mod sql {
    /// One lookup term: trimmed, with empty strings demoted to NULL so
    /// COALESCE falls through to the next key.
    fn term(column: &str, key: &str) -> String {
        format!("NULLIF(TRIM(json_extract_string({column}, '$.\"{key}\"')), '')")
    }

    /// The JSON-path lookup over raw attribute columns, equivalent to
    /// [`super::lookup`]. Used by the expression indexes and as the
    /// fallback arm of [`derived`].
    pub fn json_lookup(attrs_column: &str, resource_column: &str, keys: &[&str]) -> String {
        let mut terms = Vec::with_capacity(keys.len() * 2);
        for column in [attrs_column, resource_column] {
            for key in keys {
                terms.push(term(column, key));
            }
        }
        if terms.len() == 1 {
            terms.pop().unwrap_or_default()
        } else {
            format!("COALESCE({})", terms.join(", "))
        }
    }

    /// Query-time derivation: the backfilled literal column when populated,
    /// otherwise the raw-JSON lookup.
    pub fn derived(
        literal_column: &str,
        attrs_column: &str,
        resource_column: &str,
        keys: &[&str],
    ) -> String {
        format!(
            "COALESCE(NULLIF(TRIM({literal_column}), ''), {})",
            json_lookup(attrs_column, resource_column, keys)
        )
    }
}
