use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// JSON-RPC style request, over `POST /rpc` or a WebSocket text frame.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
}

impl RpcRequest {
    /// Decode one raw message. Malformed JSON is a parse error; JSON that is
    /// not a request (no method, non-object params) is an invalid request.
    pub fn decode(raw: &str) -> Result<Self, RpcResponse> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|_| RpcResponse::parse_error())?;
        let id = value.get("id").cloned();
        let request: Self = serde_json::from_value(value)
            .map_err(|e| RpcResponse::invalid_request(id.clone(), format!("Invalid request: {e}")))?;
        if request.method.is_empty() {
            return Err(RpcResponse::invalid_request(id, "Invalid request: method is empty"));
        }
        match &request.params {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Object(_)) => Ok(request),
            Some(_) => Err(RpcResponse::invalid_request(
                id,
                "Invalid request: params must be an object",
            )),
        }
    }
}

/// Response envelope: `{ id, success, result?, error?: { code, message } }`.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Error object. `code` is a string such as `INVALID_PARAMS`.
#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

// Standard JSON-RPC error codes (used internally for routing)
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
// Application codes
pub const NOT_FOUND: i32 = -32004;
pub const CONFLICT: i32 = -32009;

/// Map numeric error codes to their wire strings.
pub fn error_code_to_string(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "PARSE_ERROR",
        INVALID_REQUEST => "INVALID_REQUEST",
        METHOD_NOT_FOUND => "METHOD_NOT_FOUND",
        INVALID_PARAMS => "INVALID_PARAMS",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        NOT_FOUND => "NOT_FOUND",
        CONFLICT => "CONFLICT",
        _ => "UNKNOWN_ERROR",
    }
}

impl RpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(RpcError {
                code: error_code_to_string(code).to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn method_not_found(id: Option<serde_json::Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_request(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_REQUEST, msg)
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }
}

/// Extract a required string param from the RPC params object.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

/// Extract an optional `YYYY-MM-DD` param. A present but malformed value
/// is an error.
pub fn optional_date(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, String> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(Some)
            .ok_or_else(|| format!("Parameter {key} must be a YYYY-MM-DD date")),
    }
}
