//! JSON-RPC 2.0 envelope types for talking to a comment service.
//!
//! - [`RpcRequest`]: outgoing call
//! - [`RpcResponse`]: incoming reply, unwrapped into a typed result
//! - [`RpcError`]: error object with the standard and service-specific codes
//!
//! Every error carried by a response becomes `ForestError::RemoteRejected`,
//! which is what drives rollback in the controller.

use crate::error::{ForestError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC 2.0 protocol version.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Outgoing JSON-RPC 2.0 call.
///
/// # Example
///
/// ```
/// use comment_forest::rpc::RpcRequest;
/// use serde_json::json;
///
/// let request = RpcRequest::with_id("comments.set_active", json!({"id": 7, "active": false}), 3)
///     .unwrap();
/// assert_eq!(request.method, "comments.set_active");
/// assert_eq!(request.params["id"], 7);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Protocol version (always "2.0").
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: &'static str,
    /// Method parameters.
    pub params: Value,
    /// Request ID.
    pub id: u64,
}

impl RpcRequest {
    /// Builds a call with a specific ID.
    pub fn with_id(method: &'static str, params: impl Serialize, id: u64) -> Result<Self> {
        Ok(Self {
            jsonrpc: JSON_RPC_VERSION,
            method,
            params: serde_json::to_value(params)?,
            id,
        })
    }
}

/// Incoming JSON-RPC 2.0 reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version.
    pub jsonrpc: String,
    /// Result (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (present on failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Request ID.
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    /// Builds a success reply (used by tests and fakes).
    pub fn success(id: u64, result: impl Serialize) -> Result<Self> {
        Ok(Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            result: Some(serde_json::to_value(result)?),
            error: None,
            id: Some(Value::from(id)),
        })
    }

    /// Builds an error reply (used by tests and fakes).
    pub fn failure(id: u64, error: RpcError) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id: Some(Value::from(id)),
        }
    }

    /// Returns the result value, or `RemoteRejected` if the reply carries an
    /// error or no result at all.
    pub fn into_result(self) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(ForestError::remote_rejected(err));
        }
        self.result
            .ok_or_else(|| ForestError::remote_rejected("empty RPC result"))
    }

    /// Returns the result deserialized as `T`.
    ///
    /// A result of the wrong shape is also a rejection: the engine cannot
    /// confirm anything from it.
    pub fn into_typed_result<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_result()?;
        serde_json::from_value(value).map_err(|e| {
            ForestError::remote_rejected(format!("unexpected RPC result shape: {}", e))
        })
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Invalid params (-32602).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error (-32603).
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Comment or context not found (-32001).
    pub const NOT_FOUND: i32 = -32001;

    /// Validation failed (-32002).
    pub const VALIDATION_FAILED: i32 = -32002;

    /// Rate limited (-32003).
    pub const RATE_LIMITED: i32 = -32003;

    /// Unauthorized (-32005).
    pub const UNAUTHORIZED: i32 = -32005;

    /// Creates an error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for failures a retry may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self.code, Self::RATE_LIMITED | Self::INTERNAL_ERROR)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}
