//! Depth policy for nested replies.
//!
//! Roots sit at depth 0. A comment at depth `d` may receive replies only
//! while `d < max_depth`. Depth is computed by walking down from the roots
//! and carrying the path explicitly; nodes hold no parent references.

use crate::error::{ForestError, Result};
use crate::tree::constants::MAX_DEPTH;
use crate::tree::types::{CommentId, CommentNode, Forest};
use std::sync::Arc;

/// Returns the ids from the root down to `id`, inclusive.
pub fn path_to(forest: &Forest, id: &CommentId) -> Option<Vec<CommentId>> {
    let mut path = Vec::new();
    if descend(forest.roots(), id, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn descend(nodes: &[Arc<CommentNode>], id: &CommentId, path: &mut Vec<CommentId>) -> bool {
    for node in nodes {
        path.push(node.id);
        if node.id == *id || descend(&node.children, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Depth of the comment within its thread (root = 0).
pub fn depth_of(forest: &Forest, id: &CommentId) -> Result<usize> {
    path_to(forest, id)
        .map(|path| path.len() - 1)
        .ok_or(ForestError::NotFound(*id))
}

/// Ancestors of the comment, nearest last. Empty for roots.
pub fn ancestors(forest: &Forest, id: &CommentId) -> Result<Vec<CommentId>> {
    let mut path = path_to(forest, id).ok_or(ForestError::NotFound(*id))?;
    path.pop();
    Ok(path)
}

/// Whether a comment at `depth` may receive replies under [`MAX_DEPTH`].
pub fn can_reply(depth: usize) -> bool {
    depth < MAX_DEPTH
}

/// Reply depth limit, possibly stricter than [`MAX_DEPTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthPolicy {
    max_depth: usize,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

impl DepthPolicy {
    /// Creates a policy. The limit is clamped to [`MAX_DEPTH`].
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.min(MAX_DEPTH),
        }
    }

    /// Returns the configured limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether a comment at `depth` may receive replies.
    pub fn can_reply(&self, depth: usize) -> bool {
        depth < self.max_depth
    }

    /// Checks that `parent_id` exists and may receive a reply.
    ///
    /// Returns the parent's depth. Fails with `ParentNotFound` or
    /// `DepthExceeded`.
    pub fn check_reply(&self, forest: &Forest, parent_id: &CommentId) -> Result<usize> {
        let depth =
            depth_of(forest, parent_id).map_err(|_| ForestError::ParentNotFound(*parent_id))?;
        if !self.can_reply(depth) {
            return Err(ForestError::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(depth)
    }
}
