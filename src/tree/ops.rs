//! Pure query and mutation algorithms over a forest.
//!
//! Every mutation takes the current forest by reference and returns a new
//! one. The input is never modified. Along the path to the changed node each
//! ancestor is rebuilt; every other subtree is shared with the input, so
//! `Arc::ptr_eq` holds for untouched siblings.
//!
//! `reply_count` and `children` are always changed together in a single
//! rebuilt node, so no intermediate state where they disagree is observable.

use crate::error::{ForestError, Result};
use crate::tree::types::{CommentId, CommentNode, Forest};
use std::collections::HashSet;
use std::sync::Arc;

/// Finds a comment anywhere in the forest (depth-first).
pub fn find<'a>(forest: &'a Forest, id: &CommentId) -> Option<&'a CommentNode> {
    forest.iter().map(|(_, node)| node).find(|node| node.id == *id)
}

/// Finds a comment, failing with `NotFound` if it is absent.
pub fn require<'a>(forest: &'a Forest, id: &CommentId) -> Result<&'a CommentNode> {
    find(forest, id).ok_or(ForestError::NotFound(*id))
}

/// Returns true if the forest contains the id.
pub fn contains(forest: &Forest, id: &CommentId) -> bool {
    find(forest, id).is_some()
}

/// Replaces the node matching `id` with `update(node)`.
///
/// Returns the input unchanged if the id is absent. Use [`try_replace`] when
/// absence is an error.
pub fn replace<F>(forest: &Forest, id: &CommentId, update: F) -> Forest
where
    F: FnOnce(&CommentNode) -> CommentNode,
{
    try_replace(forest, id, update).unwrap_or_else(|_| forest.clone())
}

/// Replaces the node matching `id` with `update(node)`, failing with
/// `NotFound` if it is absent.
pub fn try_replace<F>(forest: &Forest, id: &CommentId, update: F) -> Result<Forest>
where
    F: FnOnce(&CommentNode) -> CommentNode,
{
    modify(forest, id, |node| Ok(update(node)))
}

/// Appends `node` to the replies of `parent_id` and increments its
/// `reply_count` by one.
pub fn insert_reply(forest: &Forest, parent_id: &CommentId, node: CommentNode) -> Result<Forest> {
    modify(forest, parent_id, |parent| {
        let mut updated = parent.clone();
        updated.children.push(Arc::new(node));
        updated.reply_count += 1;
        Ok(updated)
    })
    .map_err(|err| match err {
        ForestError::NotFound(id) => ForestError::ParentNotFound(id),
        other => other,
    })
}

/// Removes the reply `child_id` from `parent_id` entirely and decrements
/// the parent's `reply_count`.
///
/// This is the rollback of [`insert_reply`], not a soft delete.
pub fn remove_reply(
    forest: &Forest,
    parent_id: &CommentId,
    child_id: &CommentId,
) -> Result<Forest> {
    if !contains(forest, parent_id) {
        return Err(ForestError::ParentNotFound(*parent_id));
    }
    modify(forest, parent_id, |parent| {
        let index = parent
            .children
            .iter()
            .position(|child| child.id == *child_id)
            .ok_or(ForestError::NotFound(*child_id))?;
        let mut updated = parent.clone();
        updated.children.remove(index);
        updated.reply_count = updated.reply_count.saturating_sub(1);
        Ok(updated)
    })
}

/// Appends a root comment.
pub fn insert_root(forest: &Forest, node: CommentNode) -> Forest {
    let mut roots = forest.roots().to_vec();
    roots.push(Arc::new(node));
    Forest::from_shared(roots)
}

/// Removes a root comment entirely.
pub fn remove_root(forest: &Forest, id: &CommentId) -> Result<Forest> {
    let index = forest
        .roots()
        .iter()
        .position(|root| root.id == *id)
        .ok_or(ForestError::NotFound(*id))?;
    let mut roots = forest.roots().to_vec();
    roots.remove(index);
    Ok(Forest::from_shared(roots))
}

/// Recomputes every `reply_count` from the length of `children`.
///
/// Nodes that were already consistent, together with their subtrees, are
/// shared with the input.
pub fn recount(forest: &Forest) -> Forest {
    let roots = forest
        .roots()
        .iter()
        .map(|root| recount_node(root).unwrap_or_else(|| Arc::clone(root)))
        .collect();
    Forest::from_shared(roots)
}

fn recount_node(node: &Arc<CommentNode>) -> Option<Arc<CommentNode>> {
    let mut changed = node.reply_count != node.children.len();
    let children: Vec<Arc<CommentNode>> = node
        .children
        .iter()
        .map(|child| match recount_node(child) {
            Some(updated) => {
                changed = true;
                updated
            }
            None => Arc::clone(child),
        })
        .collect();

    if !changed {
        return None;
    }
    let mut updated = CommentNode::clone(node);
    updated.reply_count = children.len();
    updated.children = children;
    Some(Arc::new(updated))
}

/// A structural problem found by [`check_consistency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// `reply_count` disagrees with the number of children.
    ReplyCountMismatch {
        /// Offending comment.
        id: CommentId,
        /// Stored counter.
        reply_count: usize,
        /// Actual number of children.
        children: usize,
    },
    /// The same id appears more than once.
    DuplicateId(CommentId),
}

/// Lists every violated forest invariant. An empty result means the forest
/// is consistent.
pub fn check_consistency(forest: &Forest) -> Vec<Inconsistency> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for (_, node) in forest.iter() {
        if !seen.insert(node.id) {
            issues.push(Inconsistency::DuplicateId(node.id));
        }
        if node.reply_count != node.children.len() {
            issues.push(Inconsistency::ReplyCountMismatch {
                id: node.id,
                reply_count: node.reply_count,
                children: node.children.len(),
            });
        }
    }
    issues
}

/// Rebuilds the path to `id`, applying `update` to the matching node.
fn modify<F>(forest: &Forest, id: &CommentId, update: F) -> Result<Forest>
where
    F: FnOnce(&CommentNode) -> Result<CommentNode>,
{
    let mut update = Some(update);
    match rebuild(forest.roots(), id, &mut update)? {
        Some(roots) => Ok(Forest::from_shared(roots)),
        None => Err(ForestError::NotFound(*id)),
    }
}

/// Returns the rebuilt sibling list if `id` was found among `siblings` or
/// their descendants, `None` otherwise.
fn rebuild<F>(
    siblings: &[Arc<CommentNode>],
    id: &CommentId,
    update: &mut Option<F>,
) -> Result<Option<Vec<Arc<CommentNode>>>>
where
    F: FnOnce(&CommentNode) -> Result<CommentNode>,
{
    for (index, node) in siblings.iter().enumerate() {
        let replacement = if node.id == *id {
            match update.take() {
                Some(update) => update(node.as_ref())?,
                None => return Ok(None),
            }
        } else {
            match rebuild(&node.children, id, update)? {
                Some(children) => {
                    let mut updated = CommentNode::clone(node);
                    updated.children = children;
                    updated
                }
                None => continue,
            }
        };

        let mut rebuilt = siblings.to_vec();
        rebuilt[index] = Arc::new(replacement);
        return Ok(Some(rebuilt));
    }
    Ok(None)
}
