//! # comment-forest - Hierarchical Discussion Tree Engine
//!
//! Maintains a forest of nested comments for a discussion context and keeps
//! it responsive: replies, edits and soft deletes appear immediately and are
//! reconciled with the authoritative comment service afterwards, or rolled
//! back if the service refuses them.
//!
//! ## Features
//!
//! - **Pure tree algorithms**: find, replace, insert and remove return new
//!   forests that share untouched subtrees with their input
//! - **Depth policy**: replies below the maximum depth are refused before any
//!   network call
//! - **Optimistic updates**: local apply, then confirm or targeted rollback
//! - **Context switching**: responses for a discarded context are ignored
//!
//! ## Module Layout
//!
//! - [`tree`]: data model, algorithms, wire codec and display outline
//! - [`controller`]: the optimistic update controller
//! - [`context`]: discussion contexts and the initial load
//! - [`service`]: the comment service trait with in-memory and JSON-RPC backends
//! - [`rpc`]: JSON-RPC 2.0 envelopes
//! - [`config`], [`session`], [`error`]: ambient types
//! - [`cli`]: the `comment-forest` command-line client
//!
//! ## Example
//!
//! ```rust,no_run
//! use comment_forest::{
//!     CommentId, ContextKey, DiscussionController, EngineConfig, MemoryCommentService, Session,
//! };
//! use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> comment_forest::Result<()> {
//! let service = Arc::new(MemoryCommentService::new());
//! let (controller, _events) = DiscussionController::new(service, EngineConfig::default())?;
//! controller.load(ContextKey::topic("rust")).await?;
//!
//! let session = Session::new("u1", "Alice", "token");
//! let root = controller.submit_root_comment(&session, "First!")?.settled().await;
//! println!("{:?}", root);
//!
//! let reply = controller.submit_reply(&session, CommentId::from(1), "Welcome")?;
//! // The reply is already visible, marked pending.
//! assert_eq!(controller.forest().roots()[0].reply_count, 1);
//! reply.settled().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod rpc;
pub mod service;
pub mod session;
pub mod tree;

pub use config::{ClientConfig, EngineConfig};
pub use context::{ContextKey, ContextLoader, FetchStrategy};
pub use controller::{
    DiscussionController, EngineEvent, EventReceiver, OperationKind, Outcome, Submission,
};
pub use error::{ForestError, Result};
pub use service::{CommentService, MemoryCommentService, RpcCommentService};
pub use session::Session;
pub use tree::{CommentId, CommentNode, DisplayPolicy, Forest, MAX_DEPTH};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
