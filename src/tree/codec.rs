//! Conversion between the comment service's wire records and a [`Forest`].
//!
//! The service returns comments either nested (each record embeds its
//! `replies`) or flat (each record names its `parentId`). Decoding accepts
//! both, and mixtures of the two, by first flattening every record and then
//! rebuilding the tree from parent references.
//!
//! ## Wire Record
//!
//! ```text
//! {
//!   "id": 12, "parentId": 3, "body": "...",
//!   "authorId": "u1", "authorDisplayName": "Alice",
//!   "createdAt": 1714000000000, "updatedAt": 1714000000000,
//!   "isEdited": false, "isActive": true,
//!   "replyCount": 0, "replies": []
//! }
//! ```
//!
//! `replyCount` is advisory: decoded nodes always carry the number of
//! replies actually present.

use crate::error::{ForestError, Result};
use crate::tree::constants::MAX_WIRE_DEPTH;
use crate::tree::types::{CommentId, CommentNode, Forest};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn default_true() -> bool {
    true
}

/// A comment as exchanged with the comment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteComment {
    /// Canonical id.
    pub id: u64,
    /// Parent comment, absent for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
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
    /// Body changed after creation.
    #[serde(default)]
    pub is_edited: bool,
    /// False for soft-deleted comments.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Reply count as reported by the service.
    #[serde(default)]
    pub reply_count: usize,
    /// Nested replies (nested shape only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<RemoteComment>,
}

/// Shape produced by [`encode_forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// Replies embedded in their parent record.
    Nested,
    /// One record per comment in pre-order, linked by `parentId`.
    Flat,
}

/// A wire record with its replies detached.
struct FlatRecord {
    parent_id: Option<u64>,
    reported_replies: usize,
    node: CommentNode,
}

/// Decodes a single record (and its nested replies) into a confirmed node.
///
/// Any `parentId` on the record itself is ignored.
pub fn decode_comment(mut record: RemoteComment) -> Result<CommentNode> {
    record.parent_id = None;
    let forest = decode_forest(vec![record])?;
    forest
        .roots()
        .first()
        .map(|root| CommentNode::clone(root))
        .ok_or_else(|| ForestError::codec("empty decode result"))
}

/// Decodes service records into a forest.
///
/// Sibling order follows the order of the records. Fails on duplicate ids,
/// contradictory parent references, orphans, cycles and threads nested
/// deeper than [`MAX_WIRE_DEPTH`].
pub fn decode_forest(records: Vec<RemoteComment>) -> Result<Forest> {
    let mut flat: Vec<FlatRecord> = Vec::new();
    for record in records {
        flatten(record, None, 0, &mut flat)?;
    }

    let mut ids = HashSet::with_capacity(flat.len());
    for entry in &flat {
        let id = entry.node.id;
        if !ids.insert(id) {
            return Err(ForestError::codec(format!("duplicate comment id {}", id)));
        }
    }

    let mut children: HashMap<Option<u64>, Vec<usize>> = HashMap::new();
    for (index, entry) in flat.iter().enumerate() {
        if let Some(parent) = entry.parent_id {
            if !ids.contains(&CommentId::Canonical(parent)) {
                return Err(ForestError::codec(format!(
                    "comment {} references missing parent {}",
                    entry.node.id, parent
                )));
            }
        }
        children.entry(entry.parent_id).or_default().push(index);
    }

    let mut built = 0usize;
    let roots = match children.get(&None) {
        Some(indices) => indices
            .iter()
            .map(|&index| assemble(index, 0, &flat, &children, &mut built))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    if built != flat.len() {
        return Err(ForestError::codec(format!(
            "{} comments are unreachable from any root (cyclic parent references)",
            flat.len() - built
        )));
    }

    Ok(Forest::from_roots(roots))
}

fn too_deep(id: u64) -> ForestError {
    ForestError::codec(format!(
        "comment {} is nested deeper than {} levels",
        id, MAX_WIRE_DEPTH
    ))
}

fn flatten(
    record: RemoteComment,
    enclosing: Option<u64>,
    depth: usize,
    out: &mut Vec<FlatRecord>,
) -> Result<()> {
    if depth > MAX_WIRE_DEPTH {
        return Err(too_deep(record.id));
    }
    let parent_id = match (enclosing, record.parent_id) {
        (Some(outer), Some(declared)) if outer != declared => {
            return Err(ForestError::codec(format!(
                "comment {} is nested under {} but declares parent {}",
                record.id, outer, declared
            )));
        }
        (Some(outer), _) => Some(outer),
        (None, declared) => declared,
    };

    if parent_id == Some(record.id) {
        return Err(ForestError::codec(format!(
            "comment {} is its own parent",
            record.id
        )));
    }

    let id = record.id;
    let replies = record.replies;
    out.push(FlatRecord {
        parent_id,
        reported_replies: record.reply_count,
        node: CommentNode {
            id: CommentId::Canonical(record.id),
            body: record.body,
            author_id: record.author_id,
            author_display_name: record.author_display_name,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_edited: record.is_edited,
            is_active: record.is_active,
            reply_count: 0,
            children: Vec::new(),
            is_pending: false,
        },
    });

    for reply in replies {
        flatten(reply, Some(id), depth + 1, out)?;
    }
    Ok(())
}

fn assemble(
    index: usize,
    depth: usize,
    flat: &[FlatRecord],
    children: &HashMap<Option<u64>, Vec<usize>>,
    built: &mut usize,
) -> Result<CommentNode> {
    let entry = &flat[index];
    let key = entry.node.id.canonical();
    if depth > MAX_WIRE_DEPTH {
        return Err(too_deep(key.unwrap_or_default()));
    }
    *built += 1;
    let replies: Vec<CommentNode> = match children.get(&key) {
        Some(indices) => indices
            .iter()
            .map(|&child| assemble(child, depth + 1, flat, children, built))
            .collect::<Result<_>>()?,
        None => Vec::new(),
    };

    if entry.reported_replies != replies.len() {
        debug!(
            id = %entry.node.id,
            reported = entry.reported_replies,
            present = replies.len(),
            "Recomputed reply count"
        );
    }

    Ok(entry.node.clone().with_children(replies))
}

/// Encodes a forest for the wire.
///
/// Placeholder nodes have no canonical id and cannot be encoded.
pub fn encode_forest(forest: &Forest, shape: WireShape) -> Result<Vec<RemoteComment>> {
    match shape {
        WireShape::Nested => forest
            .roots()
            .iter()
            .map(|root| encode_nested(root, None))
            .collect(),
        WireShape::Flat => {
            let mut out = Vec::with_capacity(forest.node_count());
            for root in forest.roots() {
                encode_flat(root, None, &mut out)?;
            }
            Ok(out)
        }
    }
}

fn canonical_id(node: &CommentNode) -> Result<u64> {
    node.id.canonical().ok_or_else(|| {
        ForestError::codec(format!("pending comment {} cannot be encoded", node.id))
    })
}

fn encode_record(node: &CommentNode, id: u64, parent_id: Option<u64>) -> RemoteComment {
    RemoteComment {
        id,
        parent_id,
        body: node.body.clone(),
        author_id: node.author_id.clone(),
        author_display_name: node.author_display_name.clone(),
        created_at: node.created_at,
        updated_at: node.updated_at,
        is_edited: node.is_edited,
        is_active: node.is_active,
        reply_count: node.children.len(),
        replies: Vec::new(),
    }
}

fn encode_nested(node: &CommentNode, parent_id: Option<u64>) -> Result<RemoteComment> {
    let id = canonical_id(node)?;
    let mut record = encode_record(node, id, parent_id);
    record.replies = node
        .children
        .iter()
        .map(|child| encode_nested(child, Some(id)))
        .collect::<Result<_>>()?;
    Ok(record)
}

fn encode_flat(
    node: &CommentNode,
    parent_id: Option<u64>,
    out: &mut Vec<RemoteComment>,
) -> Result<()> {
    let id = canonical_id(node)?;
    out.push(encode_record(node, id, parent_id));
    for child in &node.children {
        encode_flat(child, Some(id), out)?;
    }
    Ok(())
}

/// Decodes a JSON array of wire records.
pub fn forest_from_json(json: &str) -> Result<Forest> {
    let records: Vec<RemoteComment> = serde_json::from_str(json)?;
    decode_forest(records)
}

/// Encodes a forest as a pretty-printed nested JSON array.
pub fn forest_to_json(forest: &Forest) -> Result<String> {
    let records = encode_forest(forest, WireShape::Nested)?;
    Ok(serde_json::to_string_pretty(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ops::{check_consistency, find};
    use serde_json::json;

    fn record(id: u64, parent_id: Option<u64>) -> RemoteComment {
        RemoteComment {
            id,
            parent_id,
            body: format!("body {}", id),
            author_id: "u1".to_string(),
            author_display_name: "Alice".to_string(),
            created_at: 1_700_000_000_000 + id,
            updated_at: 1_700_000_000_000 + id,
            is_edited: false,
            is_active: true,
            reply_count: 0,
            replies: Vec::new(),
        }
    }

    #[test]
    fn test_decode_nested_json() {
        let json = json!([
            {
                "id": 1, "body": "root", "authorId": "u1", "authorDisplayName": "Alice",
                "createdAt": 1, "updatedAt": 1, "replyCount": 1,
                "replies": [
                    { "id": 2, "body": "reply", "authorId": "u2", "authorDisplayName": "Bob",
                      "createdAt": 2, "updatedAt": 3, "isEdited": true }
                ]
            }
        ]);
        let forest = forest_from_json(&json.to_string()).unwrap();

        assert_eq!(forest.len(), 1);
        let reply = find(&forest, &CommentId::from(2)).unwrap();
        assert!(reply.is_edited);
        assert!(reply.is_active);
        assert!(!reply.is_pending);
        assert_eq!(forest.roots()[0].reply_count, 1);
    }

    #[test]
    fn test_decode_flat_records_in_any_order() {
        let records = vec![
            record(3, Some(2)),
            record(1, None),
            record(2, Some(1)),
            record(4, Some(1)),
        ];
        let forest = decode_forest(records).unwrap();

        let root = &forest.roots()[0];
        assert_eq!(root.id, CommentId::from(1));
        let reply_ids: Vec<_> = root.children.iter().map(|c| c.id).collect();
        assert_eq!(reply_ids, vec![CommentId::from(2), CommentId::from(4)]);
        assert_eq!(root.children[0].children[0].id, CommentId::from(3));
        assert!(check_consistency(&forest).is_empty());
    }

    #[test]
    fn test_decode_recomputes_reply_count() {
        let mut root = record(1, None);
        root.reply_count = 7;
        root.replies = vec![record(2, None)];
        let forest = decode_forest(vec![root]).unwrap();
        assert_eq!(forest.roots()[0].reply_count, 1);
    }

    #[test]
    fn test_decode_rejects_duplicates() {
        let result = decode_forest(vec![record(1, None), record(1, None)]);
        assert!(matches!(result, Err(ForestError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_orphans() {
        let result = decode_forest(vec![record(1, None), record(2, Some(9))]);
        assert!(
            matches!(result, Err(ForestError::Codec(msg)) if msg.contains("missing parent 9"))
        );
    }

    #[test]
    fn test_decode_rejects_cycles() {
        let result = decode_forest(vec![
            record(1, None),
            record(2, Some(3)),
            record(3, Some(2)),
        ]);
        assert!(matches!(result, Err(ForestError::Codec(msg)) if msg.contains("unreachable")));

        let result = decode_forest(vec![record(5, Some(5))]);
        assert!(matches!(result, Err(ForestError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_contradicting_parent() {
        let mut root = record(1, None);
        root.replies = vec![record(2, Some(7))];
        let result = decode_forest(vec![root, record(7, None)]);
        assert!(matches!(result, Err(ForestError::Codec(_))));
    }

    #[test]
    fn test_encode_shapes() {
        let mut root = record(1, None);
        root.replies = vec![record(2, None), record(3, None)];
        let forest = decode_forest(vec![root, record(4, None)]).unwrap();

        let nested = encode_forest(&forest, WireShape::Nested).unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].replies.len(), 2);
        assert_eq!(nested[0].reply_count, 2);
        assert_eq!(nested[0].replies[1].parent_id, Some(1));

        let flat = encode_forest(&forest, WireShape::Flat).unwrap();
        let ids: Vec<u64> = flat.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(flat.iter().all(|r| r.replies.is_empty()));
        assert_eq!(decode_forest(flat).unwrap(), forest);
    }

    #[test]
    fn test_encode_rejects_placeholders() {
        let forest = Forest::from_roots(vec![CommentNode::pending("hi", "u1", "Alice")]);
        assert!(matches!(
            encode_forest(&forest, WireShape::Flat),
            Err(ForestError::Codec(_))
        ));
    }

    #[test]
    fn test_decode_comment_ignores_own_parent() {
        let mut created = record(99, Some(1));
        created.replies = vec![record(100, None)];
        let node = decode_comment(created).unwrap();
        assert_eq!(node.id, CommentId::from(99));
        assert_eq!(node.reply_count, 1);
    }

    fn chain(len: u64) -> Vec<RemoteComment> {
        (1..=len)
            .map(|id| record(id, if id == 1 { None } else { Some(id - 1) }))
            .collect()
    }

    #[test]
    fn test_decode_accepts_deep_persisted_thread() {
        let forest = decode_forest(chain(MAX_WIRE_DEPTH as u64 + 1)).unwrap();
        assert_eq!(forest.node_count(), MAX_WIRE_DEPTH + 1);
        assert!(check_consistency(&forest).is_empty());
    }

    #[test]
    fn test_decode_rejects_runaway_flat_chain() {
        for len in [MAX_WIRE_DEPTH as u64 + 2, 1_000, 100_000] {
            let result = decode_forest(chain(len));
            assert!(
                matches!(result, Err(ForestError::Codec(ref msg)) if msg.contains("nested deeper")),
                "chain of {}: {:?}",
                len,
                result.map(|f| f.node_count())
            );
        }
    }

    #[test]
    fn test_decode_rejects_runaway_nested_chain() {
        let mut nested = record(MAX_WIRE_DEPTH as u64 + 2, None);
        for id in (1..=MAX_WIRE_DEPTH as u64 + 1).rev() {
            let mut parent = record(id, None);
            parent.replies = vec![nested];
            nested = parent;
        }
        assert!(matches!(
            decode_forest(vec![nested]),
            Err(ForestError::Codec(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            forest_from_json("{not json"),
            Err(ForestError::Serialization(_))
        ));
    }
}
