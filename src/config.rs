//! Engine and client configuration.
//!
//! Both read `COMMENT_FOREST_*` environment variables; unset variables fall
//! back to the defaults below.

use crate::error::{ForestError, Result};
use crate::service::rpc::DEFAULT_RPC_URL;
use crate::session::Session;
use crate::tree::constants::{MAX_COMMENT_BODY_SIZE, MAX_DEPTH};
use crate::tree::{DepthPolicy, DisplayPolicy};
use std::str::FromStr;

/// Maximum reply depth override.
pub const ENV_MAX_DEPTH: &str = "COMMENT_FOREST_MAX_DEPTH";
/// Maximum body size override, in bytes.
pub const ENV_MAX_BODY: &str = "COMMENT_FOREST_MAX_BODY";
/// Display policy (`hide-subtree` or `keep-replies`).
pub const ENV_DISPLAY: &str = "COMMENT_FOREST_DISPLAY";
/// Comment service endpoint.
pub const ENV_RPC_URL: &str = "COMMENT_FOREST_RPC_URL";
/// Bearer token for mutating calls.
pub const ENV_TOKEN: &str = "COMMENT_FOREST_TOKEN";
/// Signed-in user id.
pub const ENV_USER_ID: &str = "COMMENT_FOREST_USER_ID";
/// Signed-in user's display name.
pub const ENV_DISPLAY_NAME: &str = "COMMENT_FOREST_DISPLAY_NAME";

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ForestError::config(format!("{}={:?}: {}", name, value, e)))
}

/// Limits and presentation settings for a [`DiscussionController`](crate::DiscussionController).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deepest level at which replies are still rejected (roots are 0).
    pub max_depth: usize,
    /// Largest accepted comment body, in bytes.
    pub max_body_size: usize,
    /// How soft-deleted comments affect their replies on screen.
    pub display_policy: DisplayPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_body_size: MAX_COMMENT_BODY_SIZE,
            display_policy: DisplayPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            config.max_depth = parse_var(ENV_MAX_DEPTH, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_BODY) {
            config.max_body_size = parse_var(ENV_MAX_BODY, &value)?;
        }
        if let Some(value) = lookup(ENV_DISPLAY) {
            config.display_policy = value.trim().parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the limits. The depth limit may be tightened below
    /// [`MAX_DEPTH`] but never raised above it.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH {
            return Err(ForestError::config(format!(
                "max_depth must be between 1 and {}, got {}",
                MAX_DEPTH, self.max_depth
            )));
        }
        if self.max_body_size == 0 {
            return Err(ForestError::config("max_body_size must be positive"));
        }
        Ok(())
    }

    /// The reply depth policy for these limits.
    pub fn depth_policy(&self) -> DepthPolicy {
        DepthPolicy::new(self.max_depth)
    }

    /// Validates a comment body against these limits.
    pub fn check_body(&self, body: &str) -> Result<()> {
        if body.trim().is_empty() {
            return Err(ForestError::invalid_input("comment body is empty"));
        }
        if body.len() > self.max_body_size {
            return Err(ForestError::invalid_input(format!(
                "comment body is {} bytes, limit is {}",
                body.len(),
                self.max_body_size
            )));
        }
        Ok(())
    }
}

/// Settings for the command-line client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Comment service endpoint.
    pub rpc_url: String,
    /// Signed-in user, if a token is configured.
    pub session: Option<Session>,
}

impl ClientConfig {
    /// Reads the client settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the client settings through `lookup`.
    ///
    /// A token without a user id is a configuration error. The display name
    /// defaults to the user id.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = lookup(ENV_RPC_URL).unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let session = match lookup(ENV_TOKEN) {
            Some(token) => {
                let user_id = lookup(ENV_USER_ID).ok_or_else(|| {
                    ForestError::config(format!("{} is set but {} is not", ENV_TOKEN, ENV_USER_ID))
                })?;
                let display_name = lookup(ENV_DISPLAY_NAME).unwrap_or_else(|| user_id.clone());
                Some(Session::new(user_id, display_name, token))
            }
            None => None,
        };
        Ok(Self { rpc_url, session })
    }

    /// Returns the session, or an error naming the missing variables.
    pub fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or_else(|| {
            ForestError::config(format!(
                "this command needs a signed-in user; set {} and {}",
                ENV_TOKEN, ENV_USER_ID
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert_eq!(config.display_policy, DisplayPolicy::HideSubtree);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MAX_DEPTH, "2"),
            (ENV_MAX_BODY, " 64 "),
            (ENV_DISPLAY, "keep-replies"),
        ]))
        .unwrap();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.max_body_size, 64);
        assert_eq!(config.display_policy, DisplayPolicy::KeepReplies);
        assert_eq!(config.depth_policy().max_depth(), 2);
    }

    #[test]
    fn test_depth_cannot_exceed_invariant() {
        let value = (MAX_DEPTH + 1).to_string();
        let result = EngineConfig::from_lookup(lookup(&[(ENV_MAX_DEPTH, value.as_str())]));
        assert!(matches!(result, Err(ForestError::Config(_))));

        let result = EngineConfig::from_lookup(lookup(&[(ENV_MAX_DEPTH, "0")]));
        assert!(matches!(result, Err(ForestError::Config(_))));
    }

    #[test]
    fn test_unparsable_values() {
        let result = EngineConfig::from_lookup(lookup(&[(ENV_MAX_BODY, "lots")]));
        assert!(matches!(result, Err(ForestError::Config(_))));

        let result = EngineConfig::from_lookup(lookup(&[(ENV_DISPLAY, "show-all")]));
        assert!(matches!(result, Err(ForestError::Config(_))));
    }

    #[test]
    fn test_check_body() {
        let config = EngineConfig {
            max_body_size: 5,
            ..EngineConfig::default()
        };
        assert!(config.check_body("hello").is_ok());
        assert!(matches!(
            config.check_body("   \n"),
            Err(ForestError::InvalidInput(_))
        ));
        assert!(matches!(
            config.check_body("hello!"),
            Err(ForestError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_client_config() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert!(config.session.is_none());
        assert!(config.require_session().is_err());

        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_RPC_URL, "http://comments.test/rpc"),
            (ENV_TOKEN, "secret"),
            (ENV_USER_ID, "u1"),
        ]))
        .unwrap();
        let session = config.require_session().unwrap();
        assert_eq!(config.rpc_url, "http://comments.test/rpc");
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.display_name(), "u1");
        assert_eq!(session.token(), "secret");
    }

    #[test]
    fn test_token_without_user() {
        let result = ClientConfig::from_lookup(lookup(&[(ENV_TOKEN, "secret")]));
        assert!(matches!(result, Err(ForestError::Config(_))));
    }
}
