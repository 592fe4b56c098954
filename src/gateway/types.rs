//! Unified API response envelope and stable error codes.

use serde::Serialize;
use utoipa::ToSchema;

/// Every endpoint answers with this shape:
/// - `code`: 0 = success, non-zero = error code from [`error_codes`]
/// - `msg`: short human-readable description
/// - `data`: payload on success, absent on error
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error codes, grouped by concern.
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_TRANSITION: i32 = 1002;
    pub const INSUFFICIENT_REMAINING: i32 = 1003;
    pub const CONFLICT: i32 = 1004;
    pub const SYNC_BUSY: i32 = 1005;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Upstream errors (3xxx)
    pub const UPSTREAM_UNAVAILABLE: i32 = 3001;
    pub const UPSTREAM_MALFORMED: i32 = 3002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = ApiResponse::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "ok");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn error_envelope_omits_data() {
        let resp = ApiResponse::<()>::error(error_codes::NOT_FOUND, "order 7 not found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 4001);
        assert!(json.get("data").is_none());
    }
}
