//! Shared API types: error responses, pagination and list envelopes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::data::StoreError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn from_store(e: StoreError) -> Self {
        tracing::error!(error = %e, "Store error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "ok": false,
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// `{limit, offset}` pagination with endpoint-specific defaults. Values
/// that fail to parse fall back to the default; oversized limits clamp to
/// the endpoint maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn from_query(
        limit: Option<&str>,
        offset: Option<&str>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        let limit = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .map(|l| l.min(max_limit))
            .unwrap_or(default_limit);
        let offset = offset
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|o| *o >= 0)
            .unwrap_or(0);
        Self { limit, offset }
    }
}

/// Pagination metadata in responses
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub offset: i64,
    pub limit: i64,
    pub total: u64,
}

/// Generic list envelope: `{ok, items, pagination}`
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub ok: bool,
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, page: Pagination, total: u64) -> Self {
        Self {
            ok: true,
            items,
            pagination: PaginationMeta {
                offset: page.offset,
                limit: page.limit,
                total,
            },
        }
    }
}

/// Parse an optional integer query parameter, ignoring invalid values.
pub fn parse_i64_param(value: Option<&str>) -> Option<i64> {
    value.and_then(|s| s.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let page = Pagination::from_query(None, None, 100, 500);
        assert_eq!(page, Pagination { limit: 100, offset: 0 });
    }

    #[test]
    fn test_pagination_parses_values() {
        let page = Pagination::from_query(Some("25"), Some("75"), 100, 500);
        assert_eq!(page, Pagination { limit: 25, offset: 75 });
    }

    #[test]
    fn test_pagination_invalid_falls_back_to_default() {
        let page = Pagination::from_query(Some("NaN"), Some("-3"), 100, 500);
        assert_eq!(page, Pagination { limit: 100, offset: 0 });
        let page = Pagination::from_query(Some("Infinity"), None, 50, 200);
        assert_eq!(page.limit, 50);
    }

    #[test]
    fn test_pagination_zero_limit_falls_back() {
        let page = Pagination::from_query(Some("0"), None, 100, 500);
        assert_eq!(page.limit, 100);
    }

    #[test]
    fn test_pagination_clamps_to_max() {
        let page = Pagination::from_query(Some("9999"), None, 100, 500);
        assert_eq!(page.limit, 500);
    }

    #[test]
    fn test_parse_i64_param() {
        assert_eq!(parse_i64_param(Some("42")), Some(42));
        assert_eq!(parse_i64_param(Some(" 42 ")), Some(42));
        assert_eq!(parse_i64_param(Some("nope")), None);
        assert_eq!(parse_i64_param(None), None);
    }
}
