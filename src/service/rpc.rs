//! Comment service reached over JSON-RPC 2.0 / HTTP.

use super::CommentService;
use crate::context::ContextKey;
use crate::error::{ForestError, Result};
use crate::rpc::{RpcClient, RpcRequest, RpcResponse};
use crate::session::Session;
use crate::tree::codec::{decode_comment, decode_forest, RemoteComment};
use crate::tree::{CommentNode, Forest};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

/// Default comment service endpoint.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:3001/rpc";

// =============================================================================
// Method names
// =============================================================================

/// Lists comments attached to a topic.
pub const LIST_BY_TOPIC: &str = "comments.list_by_topic";
/// Lists comments attached to content within a topic.
pub const LIST_BY_CONTENT: &str = "comments.list_by_content";
/// Lists comments attached to a knowledge path.
pub const LIST_BY_KNOWLEDGE_PATH: &str = "comments.list_by_knowledge_path";
/// Creates a reply.
pub const CREATE_REPLY: &str = "comments.create_reply";
/// Creates a root comment.
pub const CREATE_ROOT: &str = "comments.create_root";
/// Replaces a comment body.
pub const UPDATE_BODY: &str = "comments.update_body";
/// Soft-deletes or restores a comment.
pub const SET_ACTIVE: &str = "comments.set_active";

/// Comment service client.
///
/// Every failure, whether transport, RPC error or an undecodable result,
/// surfaces as [`ForestError::RemoteRejected`].
#[derive(Debug)]
pub struct RpcCommentService {
    /// HTTP client
    http: Client,
    /// Endpoint and request IDs
    rpc: RpcClient,
}

impl Default for RpcCommentService {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_URL)
    }
}

impl RpcCommentService {
    /// Creates a client for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_client(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            rpc: RpcClient::new(endpoint),
        }
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    /// Sends a call and returns the typed result.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
        session: Option<&Session>,
    ) -> Result<T> {
        let request = self.rpc.build_request(method, params)?;
        let response = self.send(&request, session).await.map_err(|e| {
            error!(method, error = %e, "Comment service request failed");
            e
        })?;
        response.into_typed_result()
    }

    async fn send(&self, request: &RpcRequest, session: Option<&Session>) -> Result<RpcResponse> {
        let mut builder = self.http.post(self.rpc.endpoint()).json(request);
        if let Some(session) = session {
            builder = builder.bearer_auth(session.token());
        }

        let response = builder.send().await.map_err(ForestError::remote_rejected)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForestError::remote_rejected(format!(
                "comment service returned HTTP {}",
                status
            )));
        }
        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| ForestError::remote_rejected(format!("invalid RPC response: {}", e)))
    }

    async fn list(&self, method: &'static str, params: Value) -> Result<Forest> {
        let records: Vec<RemoteComment> = self.call(method, params, None).await?;
        let count = records.len();
        let forest = decode_forest(records).map_err(ForestError::remote_rejected)?;
        info!(method, records = count, "Fetched comments");
        Ok(forest)
    }

    async fn mutate(
        &self,
        method: &'static str,
        params: Value,
        session: &Session,
    ) -> Result<CommentNode> {
        let record: RemoteComment = self.call(method, params, Some(session)).await?;
        decode_comment(record).map_err(ForestError::remote_rejected)
    }
}

#[async_trait]
impl CommentService for RpcCommentService {
    #[instrument(skip(self))]
    async fn list_topic_comments(&self, topic_id: &str) -> Result<Forest> {
        self.list(LIST_BY_TOPIC, json!({ "topicId": topic_id })).await
    }

    #[instrument(skip(self))]
    async fn list_content_comments(&self, topic_id: &str, content_id: &str) -> Result<Forest> {
        let params = json!({ "topicId": topic_id, "contentId": content_id });
        self.list(LIST_BY_CONTENT, params).await
    }

    #[instrument(skip(self))]
    async fn list_knowledge_path_comments(&self, knowledge_path_id: &str) -> Result<Forest> {
        let params = json!({ "knowledgePathId": knowledge_path_id });
        self.list(LIST_BY_KNOWLEDGE_PATH, params).await
    }

    #[instrument(skip(self, session, body), fields(user = %session.user_id()))]
    async fn create_reply(
        &self,
        session: &Session,
        parent_id: u64,
        body: &str,
    ) -> Result<CommentNode> {
        let params = json!({ "parentId": parent_id, "body": body });
        let node = self.mutate(CREATE_REPLY, params, session).await?;
        info!(id = %node.id, parent_id, "Reply created");
        Ok(node)
    }

    #[instrument(skip(self, session, body), fields(user = %session.user_id()))]
    async fn create_root_comment(
        &self,
        session: &Session,
        context: &ContextKey,
        body: &str,
    ) -> Result<CommentNode> {
        let params = json!({ "context": context, "body": body });
        let node = self.mutate(CREATE_ROOT, params, session).await?;
        info!(id = %node.id, context = %context, "Root comment created");
        Ok(node)
    }

    #[instrument(skip(self, session, body), fields(user = %session.user_id()))]
    async fn update_comment_body(
        &self,
        session: &Session,
        id: u64,
        body: &str,
    ) -> Result<CommentNode> {
        let params = json!({ "id": id, "body": body });
        let node = self.mutate(UPDATE_BODY, params, session).await?;
        info!(id, "Comment body updated");
        Ok(node)
    }

    #[instrument(skip(self, session), fields(user = %session.user_id()))]
    async fn set_comment_active(
        &self,
        session: &Session,
        id: u64,
        active: bool,
    ) -> Result<CommentNode> {
        let params = json!({ "id": id, "active": active });
        let node = self.mutate(SET_ACTIVE, params, session).await?;
        info!(id, active, "Comment active flag updated");
        Ok(node)
    }
}
