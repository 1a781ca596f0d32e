//! JSON-RPC 2.0 plumbing for the remote comment service.
//!
//! - `types`: request/response envelopes and error codes
//! - `client`: request ID allocation and request building

pub mod client;
pub mod types;

pub use client::RpcClient;
pub use types::{RpcError, RpcRequest, RpcResponse, JSON_RPC_VERSION};
