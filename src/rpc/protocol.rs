//! JSON-RPC 2.0 message types
//!
//! Requests are validated from raw `Value`s rather than deserialized
//! directly, so that each malformed field maps to `Invalid Request` instead
//! of a generic parse failure.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Fixed `message` text for each error code.
pub fn error_message(code: i64) -> &'static str {
    match code {
        PARSE_ERROR => "Parse error",
        INVALID_REQUEST => "Invalid Request",
        METHOD_NOT_FOUND => "Method not found",
        INVALID_PARAMS => "Invalid params",
        INTERNAL_ERROR => "Internal Error",
        _ => "Server error",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build an error whose `data.stacktrace` carries `detail`.
    pub fn new(code: i64, detail: impl std::fmt::Display) -> Self {
        Self {
            code,
            message: error_message(code).to_string(),
            data: Some(json!({ "stacktrace": detail.to_string() })),
        }
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(INVALID_REQUEST, detail)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Unknown method: {}", method))
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(INVALID_PARAMS, detail)
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, detail)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// `Value::Null` for notifications.
    pub id: Value,
    pub method: String,
    /// `None` when the request carried no `params` member.
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }

    /// Check the envelope of a single request object.
    pub fn validate(raw: &Value) -> Result<Self, JsonRpcError> {
        let object = raw
            .as_object()
            .ok_or_else(|| JsonRpcError::invalid_request("Request must be an object"))?;

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(JsonRpcError::invalid_request(
                "Invalid jsonrpc: must be \"2.0\"",
            ));
        }

        let id = object.get("id").cloned().unwrap_or(Value::Null);
        if !(id.is_null() || id.is_string() || id.is_number()) {
            return Err(JsonRpcError::invalid_request(
                "Invalid id: must be null, string or number",
            ));
        }

        let method = object
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_request("Invalid method: must be string"))?
            .to_string();

        let params = match object.get("params") {
            None => None,
            Some(params @ (Value::Array(_) | Value::Object(_))) => Some(params.clone()),
            Some(_) => {
                return Err(JsonRpcError::invalid_request(
                    "Invalid params: must be array or object",
                ))
            }
        };

        Ok(Self { id, method, params })
    }
}
