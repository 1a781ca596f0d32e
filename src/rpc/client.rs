//! JSON-RPC 2.0 request builder.
//!
//! Allocates request IDs and wraps parameters into [`RpcRequest`]s. Sending
//! is left to the caller (see [`RpcCommentService`](crate::service::RpcCommentService)).
//!
//! # Example
//!
//! ```
//! use comment_forest::rpc::RpcClient;
//! use serde_json::json;
//!
//! let client = RpcClient::new("http://localhost:3001/rpc");
//!
//! let params = json!({"topicId": "t1"});
//! let request = client.build_request("comments.list_by_topic", params).unwrap();
//! assert_eq!(request.id, 1);
//!
//! let params = json!({"topicId": "t2"});
//! let request = client.build_request("comments.list_by_topic", params).unwrap();
//! assert_eq!(request.id, 2);
//! ```

use super::types::RpcRequest;
use crate::error::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Endpoint plus request ID counter.
#[derive(Debug)]
pub struct RpcClient {
    /// RPC endpoint URL.
    endpoint: String,
    /// Next request ID (atomically incremented).
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a builder for `endpoint`. Trailing slashes are dropped.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the next request ID and increments the counter.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Builds a call with the next request ID.
    pub fn build_request(
        &self,
        method: &'static str,
        params: impl Serialize,
    ) -> Result<RpcRequest> {
        RpcRequest::with_id(method, params, self.next_id())
    }
}
