//! Utility functions for CLI operations.

use crate::error::{ForestError, Result};
use crate::tree::{codec, outline, DisplayPolicy, Forest};
use chrono::{TimeZone, Utc};
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Load a forest from a JSON file of wire records (nested or flat).
pub fn read_forest(path: &Path) -> Result<Forest> {
    let json = fs::read_to_string(path)?;
    codec::forest_from_json(&json)
}

/// Format a millisecond Unix timestamp for display.
pub fn format_timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Render the visible part of a forest as indented text, one comment per
/// line.
pub fn render_forest(forest: &Forest, policy: DisplayPolicy) -> String {
    let mut out = String::new();
    for entry in outline(forest, policy) {
        let indent = "  ".repeat(entry.depth);
        let node = entry.node;
        if entry.tombstone {
            let _ = writeln!(out, "{}[{}] (deleted)", indent, node.id);
            continue;
        }
        let mut flags = String::new();
        if node.is_edited {
            flags.push_str(" (edited)");
        }
        if node.is_pending {
            flags.push_str(" (pending)");
        }
        let _ = writeln!(
            out,
            "{}[{}] {} at {}{}: {}",
            indent,
            node.id,
            node.author_display_name,
            format_timestamp(node.created_at),
            flags,
            node.body
        );
    }
    if out.is_empty() {
        out.push_str("No comments yet.\n");
    }
    out
}

/// Fail with a readable message when the user asked for a missing file.
pub fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ForestError::invalid_input(format!(
            "no such file: {}",
            path.display()
        )));
    }
    Ok(())
}
