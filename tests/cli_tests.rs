//! Command-line client tests: argument parsing and discussion files.

use comment_forest::cli::args::{parse_from, Command};
use comment_forest::cli::utils::{read_forest, render_forest};
use comment_forest::tree::codec::forest_to_json;
use comment_forest::{CommentId, CommentNode, ContextKey, DisplayPolicy, ForestError, Forest};
use std::fs;
use tempfile::TempDir;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sample_forest() -> Forest {
    let mut removed = CommentNode::new(2u64, "removed", "u2", "Bob", 1_700_000_000_000)
        .with_children(vec![CommentNode::new(
            3u64,
            "answer to removed",
            "u3",
            "Carol",
            1_700_000_060_000,
        )]);
    removed.is_active = false;
    Forest::from_roots(vec![
        CommentNode::new(1u64, "welcome", "u1", "Alice", 1_700_000_000_000)
            .with_children(vec![removed]),
    ])
}

#[test]
fn test_parse_all_commands() {
    let cases = vec![
        (
            args(&["comment", "path:k1", "hello"]),
            Command::Comment {
                context: ContextKey::knowledge_path("k1"),
                body: "hello".to_string(),
            },
        ),
        (
            args(&["edit", "topic:t", "7", "fixed typo"]),
            Command::Edit {
                context: ContextKey::topic("t"),
                id: CommentId::from(7),
                body: "fixed typo".to_string(),
            },
        ),
        (
            args(&["show-file", "dump.json", "--keep-replies"]),
            Command::ShowFile {
                file: "dump.json".into(),
                keep_replies: true,
            },
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(parse_from(&input).unwrap(), expected);
    }
}

#[test]
fn test_parse_rejects_bad_context() {
    let result = parse_from(&args(&["delete", "topic:", "4"]));
    assert!(matches!(result, Err(ForestError::InvalidInput(_))));
}

#[test]
fn test_file_round_trip_and_render() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("discussion.json");
    fs::write(&path, forest_to_json(&sample_forest()).unwrap()).unwrap();

    let forest = read_forest(&path).unwrap();
    assert_eq!(forest, sample_forest());

    let hidden = render_forest(&forest, DisplayPolicy::HideSubtree);
    assert!(hidden.contains("welcome"));
    assert!(!hidden.contains("answer to removed"));

    let kept = render_forest(&forest, DisplayPolicy::KeepReplies);
    assert!(kept.contains("  [2] (deleted)"));
    assert!(kept.contains("    [3] Carol at 2023-11-14 22:14 UTC: answer to removed"));
}

#[test]
fn test_flat_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flat.json");
    fs::write(
        &path,
        r#"[
            {"id": 5, "body": "root", "authorId": "u1", "authorDisplayName": "Alice",
             "createdAt": 0, "updatedAt": 0, "replyCount": 9},
            {"id": 6, "parentId": 5, "body": "child", "authorId": "u2",
             "authorDisplayName": "Bob", "createdAt": 1, "updatedAt": 1}
        ]"#,
    )
    .unwrap();

    let forest = read_forest(&path).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest.roots()[0].reply_count, 1);
    assert_eq!(forest.roots()[0].children[0].id, CommentId::from(6));
}

#[test]
fn test_invalid_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        read_forest(&path),
        Err(ForestError::Serialization(_))
    ));
}
