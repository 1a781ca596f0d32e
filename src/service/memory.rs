//! In-memory comment service.
//!
//! Keeps flat wire records per context and answers list calls through the
//! tree codec, the same way a remote service's rows become a forest. Besides
//! serving as a local backend it can inject failures, hold requests in
//! flight, and records every call it receives.

use crate::context::ContextKey;
use crate::error::{ForestError, Result};
use crate::service::CommentService;
use crate::session::Session;
use crate::tree::codec::{decode_comment, decode_forest, encode_forest, RemoteComment, WireShape};
use crate::tree::{current_timestamp_millis, CommentNode, Forest};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// A call received by [`MemoryCommentService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// Any of the list variants.
    List(ContextKey),
    /// `create_reply`
    CreateReply {
        /// Parent comment.
        parent_id: u64,
        /// Reply body.
        body: String,
    },
    /// `create_root_comment`
    CreateRoot {
        /// Target context.
        context: ContextKey,
        /// Comment body.
        body: String,
    },
    /// `update_comment_body`
    UpdateBody {
        /// Target comment.
        id: u64,
        /// New body.
        body: String,
    },
    /// `set_comment_active`
    SetActive {
        /// Target comment.
        id: u64,
        /// Requested state.
        active: bool,
    },
}

struct StoredComment {
    context: ContextKey,
    record: RemoteComment,
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    comments: Vec<StoredComment>,
    pending_failures: usize,
    calls: Vec<ServiceCall>,
}

impl MemoryState {
    fn find_mut(&mut self, id: u64) -> Result<&mut StoredComment> {
        self.comments
            .iter_mut()
            .find(|stored| stored.record.id == id)
            .ok_or_else(|| ForestError::remote_rejected(format!("comment {} does not exist", id)))
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process [`CommentService`].
pub struct MemoryCommentService {
    state: Mutex<MemoryState>,
    paused: watch::Sender<bool>,
}

impl Default for MemoryCommentService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCommentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryCommentService")
            .field("comments", &state.comments.len())
            .field("pending_failures", &state.pending_failures)
            .field("paused", &*self.paused.borrow())
            .finish()
    }
}

impl MemoryCommentService {
    /// Creates an empty service.
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(MemoryState::default()),
            paused,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an existing forest under `context`, keeping its canonical ids.
    pub fn seed(&self, context: &ContextKey, forest: &Forest) -> Result<()> {
        let records = encode_forest(forest, WireShape::Flat)?;
        let mut state = self.state();
        let mut seen: HashSet<u64> = state.comments.iter().map(|c| c.record.id).collect();
        if let Some(record) = records.iter().find(|record| !seen.insert(record.id)) {
            return Err(ForestError::invalid_input(format!(
                "comment {} already stored",
                record.id
            )));
        }
        for record in records {
            state.next_id = state.next_id.max(record.id);
            state.comments.push(StoredComment {
                context: context.clone(),
                record,
            });
        }
        Ok(())
    }

    /// Makes the next `count` requests fail with `RemoteRejected`.
    pub fn fail_next(&self, count: usize) {
        self.state().pending_failures = count;
    }

    /// Holds every request until [`resume`](Self::resume) is called.
    ///
    /// Calls are still recorded when they arrive.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Releases held requests.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Returns the number of stored comments.
    pub fn comment_count(&self) -> usize {
        self.state().comments.len()
    }

    /// Records the call, waits while paused, then consumes an injected
    /// failure if one is armed.
    async fn admit(&self, call: ServiceCall) -> Result<()> {
        debug!(?call, "Memory comment service received call");
        self.state().calls.push(call);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|paused| !*paused).await;

        let mut state = self.state();
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(ForestError::remote_rejected("injected failure"));
        }
        Ok(())
    }

    fn list(&self, context: &ContextKey) -> Result<Forest> {
        let records = self
            .state()
            .comments
            .iter()
            .filter(|stored| stored.context == *context)
            .map(|stored| stored.record.clone())
            .collect();
        decode_forest(records)
    }

    fn insert(
        &self,
        session: &Session,
        context: ContextKey,
        parent_id: Option<u64>,
        body: &str,
    ) -> Result<CommentNode> {
        let mut state = self.state();
        let now = current_timestamp_millis();
        let record = RemoteComment {
            id: state.allocate_id(),
            parent_id,
            body: body.to_string(),
            author_id: session.user_id().to_string(),
            author_display_name: session.display_name().to_string(),
            created_at: now,
            updated_at: now,
            is_edited: false,
            is_active: true,
            reply_count: 0,
            replies: Vec::new(),
        };
        state.comments.push(StoredComment {
            context,
            record: record.clone(),
        });
        decode_comment(record)
    }

    fn update<F>(&self, session: &Session, id: u64, change: F) -> Result<CommentNode>
    where
        F: FnOnce(&mut RemoteComment),
    {
        let mut state = self.state();
        let stored = state.find_mut(id)?;
        if stored.record.author_id != session.user_id() {
            return Err(ForestError::remote_rejected(format!(
                "user {} may not modify comment {}",
                session.user_id(),
                id
            )));
        }
        change(&mut stored.record);
        stored.record.updated_at = current_timestamp_millis();
        decode_comment(stored.record.clone())
    }
}

fn check_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(ForestError::remote_rejected("comment body cannot be empty"));
    }
    Ok(())
}

#[async_trait]
impl CommentService for MemoryCommentService {
    async fn list_topic_comments(&self, topic_id: &str) -> Result<Forest> {
        let context = ContextKey::topic(topic_id);
        self.admit(ServiceCall::List(context.clone())).await?;
        self.list(&context)
    }

    async fn list_content_comments(&self, topic_id: &str, content_id: &str) -> Result<Forest> {
        let context = ContextKey::content(topic_id, content_id);
        self.admit(ServiceCall::List(context.clone())).await?;
        self.list(&context)
    }

    async fn list_knowledge_path_comments(&self, knowledge_path_id: &str) -> Result<Forest> {
        let context = ContextKey::knowledge_path(knowledge_path_id);
        self.admit(ServiceCall::List(context.clone())).await?;
        self.list(&context)
    }

    async fn create_reply(
        &self,
        session: &Session,
        parent_id: u64,
        body: &str,
    ) -> Result<CommentNode> {
        self.admit(ServiceCall::CreateReply {
            parent_id,
            body: body.to_string(),
        })
        .await?;
        check_body(body)?;

        let context = self.state().find_mut(parent_id)?.context.clone();
        self.insert(session, context, Some(parent_id), body)
    }

    async fn create_root_comment(
        &self,
        session: &Session,
        context: &ContextKey,
        body: &str,
    ) -> Result<CommentNode> {
        self.admit(ServiceCall::CreateRoot {
            context: context.clone(),
            body: body.to_string(),
        })
        .await?;
        check_body(body)?;

        self.insert(session, context.clone(), None, body)
    }

    async fn update_comment_body(
        &self,
        session: &Session,
        id: u64,
        body: &str,
    ) -> Result<CommentNode> {
        self.admit(ServiceCall::UpdateBody {
            id,
            body: body.to_string(),
        })
        .await?;
        check_body(body)?;

        self.update(session, id, |record| {
            record.body = body.to_string();
            record.is_edited = true;
        })
    }

    async fn set_comment_active(
        &self,
        session: &Session,
        id: u64,
        active: bool,
    ) -> Result<CommentNode> {
        self.admit(ServiceCall::SetActive { id, active }).await?;

        self.update(session, id, |record| record.is_active = active)
    }
}
