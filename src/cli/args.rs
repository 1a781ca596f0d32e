//! Command-line argument parsing for comment-forest.

use crate::context::ContextKey;
use crate::error::{ForestError, Result};
use crate::tree::CommentId;
use std::path::PathBuf;

/// Command-line interface commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show {
        context: ContextKey,
        keep_replies: bool,
    },
    ShowFile {
        file: PathBuf,
        keep_replies: bool,
    },
    Comment {
        context: ContextKey,
        body: String,
    },
    Reply {
        context: ContextKey,
        parent: CommentId,
        body: String,
    },
    Edit {
        context: ContextKey,
        id: CommentId,
        body: String,
    },
    Delete {
        context: ContextKey,
        id: CommentId,
    },
    Restore {
        context: ContextKey,
        id: CommentId,
    },
    Help,
}

fn usage_error(message: &str, usage: &str) -> ForestError {
    ForestError::invalid_input(format!("{}\nUsage: comment-forest {}", message, usage))
}

fn parse_comment_id(value: &str) -> Result<CommentId> {
    let id: CommentId = value.parse().map_err(ForestError::invalid_input)?;
    if id.is_placeholder() {
        return Err(ForestError::invalid_input(format!(
            "'{}' is an unconfirmed comment id",
            value
        )));
    }
    Ok(id)
}

/// Parse command line arguments into a Command
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    parse_from(&args)
}

/// Parse arguments (without the program name) into a Command
pub fn parse_from(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let keep_replies = args.iter().any(|arg| arg == "--keep-replies");
    let positional: Vec<&str> = args[1..]
        .iter()
        .filter(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .collect();

    match command.as_str() {
        "show" => {
            let [context] = positional[..] else {
                return Err(usage_error(
                    "show requires a context",
                    "show <context> [--keep-replies]",
                ));
            };
            Ok(Command::Show {
                context: context.parse()?,
                keep_replies,
            })
        }

        "show-file" => {
            let [file] = positional[..] else {
                return Err(usage_error(
                    "show-file requires a file path",
                    "show-file <path> [--keep-replies]",
                ));
            };
            Ok(Command::ShowFile {
                file: PathBuf::from(file),
                keep_replies,
            })
        }

        "comment" => {
            let [context, body] = positional[..] else {
                return Err(usage_error(
                    "comment requires a context and a body",
                    "comment <context> <body>",
                ));
            };
            Ok(Command::Comment {
                context: context.parse()?,
                body: body.to_string(),
            })
        }

        "reply" => {
            let [context, parent, body] = positional[..] else {
                return Err(usage_error(
                    "reply requires a context, a parent id and a body",
                    "reply <context> <parent-id> <body>",
                ));
            };
            Ok(Command::Reply {
                context: context.parse()?,
                parent: parse_comment_id(parent)?,
                body: body.to_string(),
            })
        }

        "edit" => {
            let [context, id, body] = positional[..] else {
                return Err(usage_error(
                    "edit requires a context, a comment id and a body",
                    "edit <context> <id> <body>",
                ));
            };
            Ok(Command::Edit {
                context: context.parse()?,
                id: parse_comment_id(id)?,
                body: body.to_string(),
            })
        }

        "delete" | "restore" => {
            let [context, id] = positional[..] else {
                return Err(usage_error(
                    &format!("{} requires a context and a comment id", command),
                    &format!("{} <context> <id>", command),
                ));
            };
            let context = context.parse()?;
            let id = parse_comment_id(id)?;
            if command == "delete" {
                Ok(Command::Delete { context, id })
            } else {
                Ok(Command::Restore { context, id })
            }
        }

        "help" | "--help" | "-h" => Ok(Command::Help),

        other => Err(ForestError::invalid_input(format!(
            "Unknown command '{}'",
            other
        ))),
    }
}

/// Print usage information
pub fn print_usage() {
    println!("comment-forest - threaded discussions with optimistic updates");
    println!("==============================================================");
    println!();
    println!("Usage: comment-forest <command> [args...]");
    println!();
    println!("Commands:");
    println!("  show <context> [--keep-replies]       Print the discussion of a context");
    println!("  show-file <path> [--keep-replies]     Print a discussion stored as JSON");
    println!("  comment <context> <body>              Post a root comment");
    println!("  reply <context> <parent-id> <body>    Reply to a comment");
    println!("  edit <context> <id> <body>            Replace a comment's body");
    println!("  delete <context> <id>                 Soft-delete a comment");
    println!("  restore <context> <id>                Restore a soft-deleted comment");
    println!();
    println!("Contexts:");
    println!("  topic:<id>                  Discussion of a topic");
    println!("  topic:<id>/content:<id>     Discussion of content within a topic");
    println!("  path:<id>                   Discussion of a knowledge path");
    println!();
    println!("Environment:");
    println!("  COMMENT_FOREST_RPC_URL        Comment service endpoint");
    println!("  COMMENT_FOREST_TOKEN          Bearer token (mutating commands)");
    println!("  COMMENT_FOREST_USER_ID        Signed-in user id");
    println!("  COMMENT_FOREST_DISPLAY_NAME   Signed-in user's display name");
    println!("  COMMENT_FOREST_DISPLAY        hide-subtree (default) or keep-replies");
    println!();
    println!("Examples:");
    println!("  comment-forest show topic:rust --keep-replies");
    println!("  comment-forest reply topic:rust/content:intro 12 'Good point'");
    println!("  comment-forest delete path:beginner 40");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_from(&args)
    }

    #[test]
    fn test_show() {
        assert_eq!(
            parse(&["show", "topic:t1", "--keep-replies"]).unwrap(),
            Command::Show {
                context: ContextKey::topic("t1"),
                keep_replies: true,
            }
        );
        assert_eq!(
            parse(&["show", "path:p"]).unwrap(),
            Command::Show {
                context: ContextKey::knowledge_path("p"),
                keep_replies: false,
            }
        );
    }

    #[test]
    fn test_reply() {
        assert_eq!(
            parse(&["reply", "topic:t/content:c", "12", "hello there"]).unwrap(),
            Command::Reply {
                context: ContextKey::content("t", "c"),
                parent: CommentId::from(12),
                body: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn test_delete_and_restore() {
        assert!(matches!(
            parse(&["delete", "topic:t", "3"]).unwrap(),
            Command::Delete { .. }
        ));
        assert!(matches!(
            parse(&["restore", "topic:t", "3"]).unwrap(),
            Command::Restore { .. }
        ));
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["reply", "topic:t", "12"]).is_err());
        assert!(parse(&["reply", "topic:t", "twelve", "body"]).is_err());
        assert!(parse(&["show", "forum:x"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        let placeholder = CommentId::placeholder().to_string();
        assert!(parse(&["edit", "topic:t", placeholder.as_str(), "x"]).is_err());
    }

    #[test]
    fn test_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
    }
}
