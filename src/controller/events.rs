//! Notifications about settled operations.

use crate::tree::CommentId;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Events buffered for a receiver that is not keeping up. Further events are
/// dropped with a warning until it drains the channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receiving end of the controller's event channel.
pub type EventReceiver = mpsc::Receiver<EngineEvent>;

/// The three optimistic mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Creation of a reply or root comment.
    AddReply,
    /// Body replacement.
    EditBody,
    /// Soft delete or restore.
    ToggleActive,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::AddReply => write!(f, "add-reply"),
            OperationKind::EditBody => write!(f, "edit-body"),
            OperationKind::ToggleActive => write!(f, "toggle-active"),
        }
    }
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The service accepted the change. Carries the canonical id of the
    /// affected comment.
    Confirmed(CommentId),
    /// The service refused the change and the optimistic step was undone.
    RolledBack {
        /// Rejection message.
        reason: String,
    },
    /// The context was switched or unloaded before the response arrived;
    /// the response was ignored.
    Discarded,
}

impl Outcome {
    /// Returns true for [`Outcome::Confirmed`].
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed(_))
    }

    /// Returns true for [`Outcome::RolledBack`].
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Outcome::RolledBack { .. })
    }
}

/// A settled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineEvent {
    /// What was attempted.
    pub kind: OperationKind,
    /// The id the operation was submitted against (a placeholder for
    /// creations).
    pub target: CommentId,
    /// How it ended.
    pub outcome: Outcome,
}
