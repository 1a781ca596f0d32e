//! Error types for discussion tree operations.

use crate::tree::CommentId;
use thiserror::Error;

/// Result type alias for discussion tree operations.
pub type Result<T> = std::result::Result<T, ForestError>;

/// Main error type for discussion tree operations.
#[derive(Error, Debug)]
pub enum ForestError {
    /// The target comment is not in the working forest.
    #[error("Comment not found: {0}")]
    NotFound(CommentId),

    /// The comment a reply was aimed at is not in the working forest.
    #[error("Parent comment not found: {0}")]
    ParentNotFound(CommentId),

    /// A reply was attempted below the deepest permitted level.
    #[error("Reply depth exceeded: parent is at depth {depth}, replies allowed below depth {max}")]
    DepthExceeded {
        /// Depth of the parent the reply targeted.
        depth: usize,
        /// Maximum depth at which replies are still accepted.
        max: usize,
    },

    /// The remote comment service refused or failed the request.
    #[error("Rejected by comment service: {0}")]
    RemoteRejected(String),

    /// The comment is unconfirmed or already has an operation in flight.
    #[error("Operation already pending for comment {0}")]
    Pending(CommentId),

    /// No discussion context is loaded.
    #[error("No discussion context loaded")]
    NoContext,

    /// A newer context switch superseded this operation.
    #[error("Discussion context changed while loading")]
    ContextChanged,

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed comment data from the wire.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForestError {
    /// Creates a new remote rejection error.
    pub fn remote_rejected<T: ToString>(msg: T) -> Self {
        Self::RemoteRejected(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Creates a new codec error.
    pub fn codec<T: ToString>(msg: T) -> Self {
        Self::Codec(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Returns true for errors that are resolved without touching the
    /// forest or the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ForestError::NotFound(_)
                | ForestError::ParentNotFound(_)
                | ForestError::DepthExceeded { .. }
                | ForestError::Pending(_)
                | ForestError::NoContext
                | ForestError::InvalidInput(_)
        )
    }

    /// Returns true if the comment service rejected the request.
    ///
    /// These are user-visible and recoverable; the caller may retry.
    pub fn is_remote(&self) -> bool {
        matches!(self, ForestError::RemoteRejected(_))
    }
}

impl From<serde_json::Error> for ForestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ForestError::NotFound(CommentId::from(1)).is_local());
        assert!(ForestError::DepthExceeded { depth: 3, max: 3 }.is_local());
        assert!(!ForestError::remote_rejected("boom").is_local());
        assert!(ForestError::remote_rejected("boom").is_remote());
        assert!(!ForestError::codec("bad").is_remote());
    }

    #[test]
    fn test_error_messages() {
        let err = ForestError::ParentNotFound(CommentId::from(7));
        assert_eq!(err.to_string(), "Parent comment not found: 7");

        let err = ForestError::remote_rejected("validation failed");
        assert_eq!(
            err.to_string(),
            "Rejected by comment service: validation failed"
        );
    }
}
