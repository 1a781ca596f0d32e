//! Discussion tree data model and algorithms.
//!
//! ## Hierarchy
//!
//! ```text
//! Forest (one per discussion context)
//!     └── CommentNode (root, depth 0)
//!             └── CommentNode (reply, depth 1)
//!                     └── CommentNode (reply, depth 2)
//!                             └── CommentNode (reply, depth 3 = MAX_DEPTH)
//! ```
//!
//! Parents own their replies; there are no back references. Everything in
//! this module is synchronous and pure: mutations return a new [`Forest`]
//! and leave their input untouched.

pub mod codec;
pub mod constants;
pub mod depth;
pub mod display;
pub mod ops;
pub mod types;

pub use codec::{decode_comment, decode_forest, encode_forest, RemoteComment, WireShape};
pub use constants::{MAX_COMMENT_BODY_SIZE, MAX_DEPTH, MAX_WIRE_DEPTH};
pub use depth::{ancestors, can_reply, depth_of, DepthPolicy};
pub use display::{outline, DisplayPolicy, OutlineEntry};
pub use ops::{
    check_consistency, find, insert_reply, insert_root, recount, remove_reply, remove_root,
    replace, require, try_replace, Inconsistency,
};
pub use types::{current_timestamp_millis, CommentId, CommentNode, Forest};
