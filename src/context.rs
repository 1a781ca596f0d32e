//! Discussion contexts and the initial forest load.
//!
//! A discussion hangs off one of three things: a topic, a piece of content
//! within a topic, or a knowledge path. The [`ContextKey`] names which one,
//! and [`ContextLoader`] picks the matching list call on the comment service.

use crate::error::{ForestError, Result};
use crate::service::CommentService;
use crate::tree::ops::check_consistency;
use crate::tree::Forest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Identifies the forest a view works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextKey {
    /// Discussion attached to a topic.
    Topic {
        /// Topic id.
        topic_id: String,
    },
    /// Discussion attached to one piece of content inside a topic.
    Content {
        /// Topic id.
        topic_id: String,
        /// Content id within the topic.
        content_id: String,
    },
    /// Discussion attached to a knowledge path.
    KnowledgePath {
        /// Knowledge path id.
        knowledge_path_id: String,
    },
}

impl ContextKey {
    /// Context for a topic.
    pub fn topic(topic_id: impl Into<String>) -> Self {
        ContextKey::Topic {
            topic_id: topic_id.into(),
        }
    }

    /// Context for content within a topic.
    pub fn content(topic_id: impl Into<String>, content_id: impl Into<String>) -> Self {
        ContextKey::Content {
            topic_id: topic_id.into(),
            content_id: content_id.into(),
        }
    }

    /// Context for a knowledge path.
    pub fn knowledge_path(knowledge_path_id: impl Into<String>) -> Self {
        ContextKey::KnowledgePath {
            knowledge_path_id: knowledge_path_id.into(),
        }
    }

    /// The list call that loads this context.
    pub fn strategy(&self) -> FetchStrategy {
        match self {
            ContextKey::Topic { .. } => FetchStrategy::ByTopic,
            ContextKey::Content { .. } => FetchStrategy::ByContent,
            ContextKey::KnowledgePath { .. } => FetchStrategy::ByKnowledgePath,
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKey::Topic { topic_id } => write!(f, "topic:{}", topic_id),
            ContextKey::Content {
                topic_id,
                content_id,
            } => write!(f, "topic:{}/content:{}", topic_id, content_id),
            ContextKey::KnowledgePath { knowledge_path_id } => {
                write!(f, "path:{}", knowledge_path_id)
            }
        }
    }
}

impl FromStr for ContextKey {
    type Err = ForestError;

    /// Parses `topic:<id>`, `topic:<id>/content:<id>` or `path:<id>`.
    fn from_str(s: &str) -> Result<Self> {
        fn non_empty(value: &str, what: &str) -> Result<String> {
            if value.is_empty() {
                return Err(ForestError::invalid_input(format!("empty {} id", what)));
            }
            Ok(value.to_string())
        }

        if let Some(path) = s.strip_prefix("path:") {
            return Ok(ContextKey::knowledge_path(non_empty(path, "knowledge path")?));
        }
        if let Some(rest) = s.strip_prefix("topic:") {
            return match rest.split_once("/content:") {
                Some((topic, content)) => Ok(ContextKey::content(
                    non_empty(topic, "topic")?,
                    non_empty(content, "content")?,
                )),
                None => Ok(ContextKey::topic(non_empty(rest, "topic")?)),
            };
        }
        Err(ForestError::invalid_input(format!(
            "invalid context '{}' (expected topic:<id>, topic:<id>/content:<id> or path:<id>)",
            s
        )))
    }
}

/// Which list call loads a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// `list_topic_comments`
    ByTopic,
    /// `list_content_comments`
    ByContent,
    /// `list_knowledge_path_comments`
    ByKnowledgePath,
}

/// Loads the initial forest for a context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextLoader;

impl ContextLoader {
    /// Fetches the forest for `key` with exactly one list call.
    ///
    /// Any service failure is reported as `RemoteRejected`.
    pub async fn load(&self, service: &dyn CommentService, key: &ContextKey) -> Result<Forest> {
        let strategy = key.strategy();
        debug!(context = %key, ?strategy, "Loading discussion");

        let result = match key {
            ContextKey::Topic { topic_id } => service.list_topic_comments(topic_id).await,
            ContextKey::Content {
                topic_id,
                content_id,
            } => service.list_content_comments(topic_id, content_id).await,
            ContextKey::KnowledgePath { knowledge_path_id } => {
                service
                    .list_knowledge_path_comments(knowledge_path_id)
                    .await
            }
        };

        let forest = match result {
            Ok(forest) => forest,
            Err(err) if err.is_remote() => return Err(err),
            Err(err) => return Err(ForestError::remote_rejected(err)),
        };

        let issues = check_consistency(&forest);
        if !issues.is_empty() {
            warn!(context = %key, ?issues, "Comment service returned an inconsistent forest");
            return Err(ForestError::remote_rejected(format!(
                "inconsistent forest for {}: {} issue(s)",
                key,
                issues.len()
            )));
        }

        info!(
            context = %key,
            roots = forest.len(),
            comments = forest.node_count(),
            "Loaded discussion"
        );
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{MemoryCommentService, ServiceCall};
    use crate::session::Session;

    #[test]
    fn test_context_key_parse_and_display() {
        for text in ["topic:rust", "topic:rust/content:ownership", "path:beginner"] {
            let key: ContextKey = text.parse().unwrap();
            assert_eq!(key.to_string(), text);
        }
        assert_eq!(
            "topic:a/content:b".parse::<ContextKey>().unwrap(),
            ContextKey::content("a", "b")
        );
        assert!("topic:".parse::<ContextKey>().is_err());
        assert!("topic:a/content:".parse::<ContextKey>().is_err());
        assert!("board:a".parse::<ContextKey>().is_err());
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(ContextKey::topic("t").strategy(), FetchStrategy::ByTopic);
        assert_eq!(
            ContextKey::content("t", "c").strategy(),
            FetchStrategy::ByContent
        );
        assert_eq!(
            ContextKey::knowledge_path("p").strategy(),
            FetchStrategy::ByKnowledgePath
        );
    }

    #[tokio::test]
    async fn test_loader_issues_one_matching_call() {
        let service = MemoryCommentService::new();
        let session = Session::new("u1", "Alice", "token");
        let key = ContextKey::content("t1", "c1");
        service
            .create_root_comment(&session, &key, "hello")
            .await
            .unwrap();
        service
            .create_root_comment(&session, &ContextKey::topic("t1"), "elsewhere")
            .await
            .unwrap();
        service.clear_calls();

        let forest = ContextLoader.load(&service, &key).await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.roots()[0].body, "hello");
        assert_eq!(service.calls(), vec![ServiceCall::List(key)]);
    }

    #[tokio::test]
    async fn test_loader_maps_failures_to_remote_rejected() {
        let service = MemoryCommentService::new();
        service.fail_next(1);
        let result = ContextLoader
            .load(&service, &ContextKey::knowledge_path("p"))
            .await;
        assert!(matches!(result, Err(ForestError::RemoteRejected(_))));
    }
}
