//! Optimistic operations: local apply, confirmation and targeted rollback.
//!
//! Each operation records only what it needs to undo itself: the placeholder
//! it inserted, or the fields it overwrote. Rolling back therefore never
//! touches changes made by other operations in the meantime.

use super::events::OperationKind;
use crate::error::Result;
use crate::tree::ops::{insert_reply, insert_root, remove_reply, remove_root, require, try_replace};
use crate::tree::{CommentId, CommentNode, Forest};

/// An applied, not yet settled mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A placeholder was inserted under `parent` (or as a root).
    AddReply {
        /// Parent comment, `None` for root comments.
        parent: Option<CommentId>,
        /// Placeholder id of the inserted node.
        placeholder: CommentId,
    },
    /// The body of `target` was replaced.
    EditBody {
        /// Edited comment.
        target: CommentId,
        /// Body before the edit.
        prior_body: String,
        /// `is_edited` before the edit.
        prior_is_edited: bool,
    },
    /// `target` was soft-deleted or restored.
    ToggleActive {
        /// Affected comment.
        target: CommentId,
        /// `is_active` before the change.
        prior_active: bool,
    },
}

fn settled(node: &CommentNode) -> CommentNode {
    CommentNode {
        is_pending: false,
        ..node.clone()
    }
}

impl Operation {
    /// Inserts `node` as a pending reply to `parent`.
    pub fn add_reply(
        forest: &Forest,
        parent: CommentId,
        node: CommentNode,
    ) -> Result<(Self, Forest)> {
        let placeholder = node.id;
        let forest = insert_reply(forest, &parent, node)?;
        let op = Operation::AddReply {
            parent: Some(parent),
            placeholder,
        };
        Ok((op, forest))
    }

    /// Appends `node` as a pending root comment.
    pub fn add_root(forest: &Forest, node: CommentNode) -> (Self, Forest) {
        let placeholder = node.id;
        let forest = insert_root(forest, node);
        let op = Operation::AddReply {
            parent: None,
            placeholder,
        };
        (op, forest)
    }

    /// Replaces the body of `target` and marks it edited and pending.
    pub fn edit_body(forest: &Forest, target: CommentId, body: String) -> Result<(Self, Forest)> {
        let current = require(forest, &target)?;
        let op = Operation::EditBody {
            target,
            prior_body: current.body.clone(),
            prior_is_edited: current.is_edited,
        };
        let forest = try_replace(forest, &target, |node| CommentNode {
            body,
            is_edited: true,
            is_pending: true,
            ..node.clone()
        })?;
        Ok((op, forest))
    }

    /// Sets `is_active` on `target` and marks it pending.
    pub fn toggle_active(
        forest: &Forest,
        target: CommentId,
        active: bool,
    ) -> Result<(Self, Forest)> {
        let current = require(forest, &target)?;
        let op = Operation::ToggleActive {
            target,
            prior_active: current.is_active,
        };
        let forest = try_replace(forest, &target, |node| CommentNode {
            is_active: active,
            is_pending: true,
            ..node.clone()
        })?;
        Ok((op, forest))
    }

    /// Which kind of mutation this is.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AddReply { .. } => OperationKind::AddReply,
            Operation::EditBody { .. } => OperationKind::EditBody,
            Operation::ToggleActive { .. } => OperationKind::ToggleActive,
        }
    }

    /// The id the operation locks while in flight.
    pub fn target(&self) -> CommentId {
        match self {
            Operation::AddReply { placeholder, .. } => *placeholder,
            Operation::EditBody { target, .. } | Operation::ToggleActive { target, .. } => *target,
        }
    }

    /// Reconciles the forest with the service's accepted node.
    ///
    /// A created placeholder is replaced by `canonical`, keeping whatever
    /// replies sit under it. Edits and toggles already hold the right values
    /// and only lose their pending flag.
    pub fn confirm(&self, forest: &Forest, canonical: CommentNode) -> Result<Forest> {
        match self {
            Operation::AddReply { placeholder, .. } => {
                try_replace(forest, placeholder, |node| CommentNode {
                    reply_count: node.children.len(),
                    children: node.children.clone(),
                    is_pending: false,
                    ..canonical
                })
            }
            Operation::EditBody { target, .. } | Operation::ToggleActive { target, .. } => {
                try_replace(forest, target, settled)
            }
        }
    }

    /// Undoes the local step.
    pub fn rollback(&self, forest: &Forest) -> Result<Forest> {
        match self {
            Operation::AddReply {
                parent: Some(parent),
                placeholder,
            } => remove_reply(forest, parent, placeholder),
            Operation::AddReply {
                parent: None,
                placeholder,
            } => remove_root(forest, placeholder),
            Operation::EditBody {
                target,
                prior_body,
                prior_is_edited,
            } => try_replace(forest, target, |node| CommentNode {
                body: prior_body.clone(),
                is_edited: *prior_is_edited,
                is_pending: false,
                ..node.clone()
            }),
            Operation::ToggleActive {
                target,
                prior_active,
            } => try_replace(forest, target, |node| CommentNode {
                is_active: *prior_active,
                is_pending: false,
                ..node.clone()
            }),
        }
    }
}
