//! Shared limits for discussion trees.

// =============================================================================
// Depth Limits
// =============================================================================

/// Deepest level (root = 0) at which a comment may still receive replies.
///
/// Replies are accepted under nodes with `depth < MAX_DEPTH`, so no comment
/// created by the engine sits deeper than `MAX_DEPTH`.
pub const MAX_DEPTH: usize = 3;

/// Deepest nesting level accepted when decoding stored or remote threads.
///
/// Persisted data may sit deeper than `MAX_DEPTH`; anything past this bound
/// is rejected as malformed.
pub const MAX_WIRE_DEPTH: usize = 64;

// =============================================================================
// Content Size Limits
// =============================================================================

/// Maximum comment body size (10KB).
pub const MAX_COMMENT_BODY_SIZE: usize = 10 * 1024;

/// Prefix used when rendering placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "tmp-";
