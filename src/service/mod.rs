//! The remote comment service as seen by the engine.
//!
//! The service is authoritative: it stores comments, assigns canonical ids
//! and timestamps, and decides whether a change is accepted. The engine only
//! consumes it through [`CommentService`].
//!
//! ## Implementations
//!
//! - [`MemoryCommentService`]: in-process store, used for local runs and tests
//! - [`RpcCommentService`]: JSON-RPC 2.0 over HTTP

pub mod memory;
pub mod rpc;

pub use memory::{MemoryCommentService, ServiceCall};
pub use rpc::RpcCommentService;

use crate::context::ContextKey;
use crate::error::Result;
use crate::session::Session;
use crate::tree::{CommentNode, Forest};
use async_trait::async_trait;

/// Remote comment persistence.
///
/// Every method may fail; the engine treats any failure as a rejection.
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Lists the discussion attached to a topic.
    async fn list_topic_comments(&self, topic_id: &str) -> Result<Forest>;

    /// Lists the discussion attached to content within a topic.
    async fn list_content_comments(&self, topic_id: &str, content_id: &str) -> Result<Forest>;

    /// Lists the discussion attached to a knowledge path.
    async fn list_knowledge_path_comments(&self, knowledge_path_id: &str) -> Result<Forest>;

    /// Creates a reply and returns the canonical node.
    async fn create_reply(
        &self,
        session: &Session,
        parent_id: u64,
        body: &str,
    ) -> Result<CommentNode>;

    /// Creates a root comment in a context and returns the canonical node.
    async fn create_root_comment(
        &self,
        session: &Session,
        context: &ContextKey,
        body: &str,
    ) -> Result<CommentNode>;

    /// Replaces a comment's body.
    async fn update_comment_body(
        &self,
        session: &Session,
        id: u64,
        body: &str,
    ) -> Result<CommentNode>;

    /// Soft-deletes (`active = false`) or restores a comment.
    async fn set_comment_active(
        &self,
        session: &Session,
        id: u64,
        active: bool,
    ) -> Result<CommentNode>;
}
