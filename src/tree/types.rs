//! Core data types for discussion trees.
//!
//! - `CommentId`: canonical (service-assigned) or placeholder (local) id
//! - `CommentNode`: one discussion entry owning its replies
//! - `Forest`: the ordered root comments of one discussion context
//!
//! Children are held behind `Arc` so that a new forest produced by the tree
//! algorithms shares every subtree it did not touch with its predecessor.

use crate::tree::constants::PLACEHOLDER_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Returns the current time in milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Identifier of a comment.
///
/// A logical comment carries exactly one of the two forms at a time: a
/// placeholder while its creation is in flight, a canonical id afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommentId {
    /// Stable id assigned by the comment service.
    Canonical(u64),
    /// Locally generated id of an unconfirmed comment.
    Placeholder(Uuid),
}

impl CommentId {
    /// Generates a fresh placeholder id.
    pub fn placeholder() -> Self {
        CommentId::Placeholder(Uuid::new_v4())
    }

    /// Returns the canonical id, if this is one.
    pub fn canonical(&self) -> Option<u64> {
        match self {
            CommentId::Canonical(id) => Some(*id),
            CommentId::Placeholder(_) => None,
        }
    }

    /// Returns true for locally generated ids.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, CommentId::Placeholder(_))
    }
}

impl From<u64> for CommentId {
    fn from(id: u64) -> Self {
        CommentId::Canonical(id)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentId::Canonical(id) => write!(f, "{}", id),
            CommentId::Placeholder(uuid) => write!(f, "{}{}", PLACEHOLDER_PREFIX, uuid),
        }
    }
}

impl FromStr for CommentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix(PLACEHOLDER_PREFIX) {
            return Uuid::parse_str(rest)
                .map(CommentId::Placeholder)
                .map_err(|e| format!("invalid placeholder id '{}': {}", s, e));
        }
        s.parse::<u64>()
            .map(CommentId::Canonical)
            .map_err(|_| format!("invalid comment id '{}'", s))
    }
}

/// One discussion entry.
///
/// `reply_count` always equals `children.len()` once a mutation has completed;
/// the tree algorithms update both in the same step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    /// Canonical or placeholder id.
    pub id: CommentId,
    /// Text content.
    pub body: String,
    /// Author's user id.
    pub author_id: String,
    /// Author's display name.
    pub author_display_name: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at: u64,
    /// Last update timestamp in milliseconds since Unix epoch.
    pub updated_at: u64,
    /// Set once the body has changed after creation.
    pub is_edited: bool,
    /// False marks a soft-deleted comment.
    pub is_active: bool,
    /// Number of direct replies.
    pub reply_count: usize,
    /// Direct replies, in display order.
    pub children: Vec<Arc<CommentNode>>,
    /// True while an optimistic mutation on this node awaits the service.
    pub is_pending: bool,
}

impl CommentNode {
    /// Creates a confirmed, active comment without replies.
    pub fn new(
        id: impl Into<CommentId>,
        body: impl Into<String>,
        author_id: impl Into<String>,
        author_display_name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            author_id: author_id.into(),
            author_display_name: author_display_name.into(),
            created_at,
            updated_at: created_at,
            is_edited: false,
            is_active: true,
            reply_count: 0,
            children: Vec::new(),
            is_pending: false,
        }
    }

    /// Creates a pending comment under a fresh placeholder id.
    pub fn pending(
        body: impl Into<String>,
        author_id: impl Into<String>,
        author_display_name: impl Into<String>,
    ) -> Self {
        let now = current_timestamp_millis();
        Self {
            is_pending: true,
            ..Self::new(
                CommentId::placeholder(),
                body,
                author_id,
                author_display_name,
                now,
            )
        }
    }

    /// Replaces the replies, keeping `reply_count` in step.
    pub fn with_children(mut self, children: Vec<CommentNode>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self.reply_count = self.children.len();
        self
    }

    /// Returns true if this comment has direct replies.
    pub fn has_replies(&self) -> bool {
        !self.children.is_empty()
    }
}

/// The root comments of one discussion context and all of their replies.
///
/// Cloning is cheap: only the root vector is copied, nodes are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forest {
    roots: Vec<Arc<CommentNode>>,
}

impl Forest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a forest from owned root comments.
    pub fn from_roots(roots: Vec<CommentNode>) -> Self {
        Self {
            roots: roots.into_iter().map(Arc::new).collect(),
        }
    }

    /// Creates a forest from already shared root comments.
    pub fn from_shared(roots: Vec<Arc<CommentNode>>) -> Self {
        Self { roots }
    }

    /// Returns the root comments.
    pub fn roots(&self) -> &[Arc<CommentNode>] {
        &self.roots
    }

    /// Returns the number of root comments.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns true if the forest has no comments.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Counts every comment in the forest.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Iterates `(depth, node)` in depth-first pre-order.
    pub fn iter(&self) -> ForestIter<'_> {
        ForestIter {
            stack: self.roots.iter().rev().map(|n| (0, n.as_ref())).collect(),
        }
    }
}

/// Depth-first pre-order iterator over a forest.
#[derive(Debug)]
pub struct ForestIter<'a> {
    stack: Vec<(usize, &'a CommentNode)>,
}

impl<'a> Iterator for ForestIter<'a> {
    type Item = (usize, &'a CommentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (depth + 1, c.as_ref())));
        Some((depth, node))
    }
}
