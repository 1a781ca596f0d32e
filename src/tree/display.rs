//! Display view over a forest.
//!
//! Soft-deleted comments stay in the data model together with their replies.
//! Whether those replies are shown is a presentation decision captured by
//! [`DisplayPolicy`]; [`outline`] flattens the forest into the rows a
//! presentation layer renders.

use crate::error::ForestError;
use crate::tree::types::{CommentNode, Forest};
use std::fmt;
use std::str::FromStr;

/// How inactive comments affect their replies on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayPolicy {
    /// An inactive comment hides its whole sub-thread.
    #[default]
    HideSubtree,
    /// An inactive comment is shown as a tombstone while any reply below it
    /// is still visible.
    KeepReplies,
}

impl fmt::Display for DisplayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayPolicy::HideSubtree => write!(f, "hide-subtree"),
            DisplayPolicy::KeepReplies => write!(f, "keep-replies"),
        }
    }
}

impl FromStr for DisplayPolicy {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hide-subtree" => Ok(DisplayPolicy::HideSubtree),
            "keep-replies" => Ok(DisplayPolicy::KeepReplies),
            other => Err(ForestError::config(format!(
                "unknown display policy '{}' (expected hide-subtree or keep-replies)",
                other
            ))),
        }
    }
}

/// One rendered row.
#[derive(Debug, Clone, Copy)]
pub struct OutlineEntry<'a> {
    /// Nesting depth (root = 0).
    pub depth: usize,
    /// The comment.
    pub node: &'a CommentNode,
    /// True when the comment is inactive and shown only to carry its replies.
    pub tombstone: bool,
}

/// Flattens the visible part of the forest in display order.
pub fn outline(forest: &Forest, policy: DisplayPolicy) -> Vec<OutlineEntry<'_>> {
    let mut rows = Vec::new();
    for root in forest.roots() {
        push_visible(root, 0, policy, &mut rows);
    }
    rows
}

/// Appends the visible rows for `node`; returns true if any row was added.
fn push_visible<'a>(
    node: &'a CommentNode,
    depth: usize,
    policy: DisplayPolicy,
    rows: &mut Vec<OutlineEntry<'a>>,
) -> bool {
    if node.is_active {
        rows.push(OutlineEntry {
            depth,
            node,
            tombstone: false,
        });
        for child in &node.children {
            push_visible(child, depth + 1, policy, rows);
        }
        return true;
    }

    match policy {
        DisplayPolicy::HideSubtree => false,
        DisplayPolicy::KeepReplies => {
            let marker = rows.len();
            rows.push(OutlineEntry {
                depth,
                node,
                tombstone: true,
            });
            let mut any_visible = false;
            for child in &node.children {
                any_visible |= push_visible(child, depth + 1, policy, rows);
            }
            if !any_visible {
                rows.truncate(marker);
            }
            any_visible
        }
    }
}
