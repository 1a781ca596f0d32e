//! Authenticated user capability.
//!
//! Mutating actions take a [`Session`] explicitly instead of consulting
//! global login state. Holding one is the proof that a user is signed in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated user and the token used to call the comment service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: String,
    display_name: String,
    token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Session {
    /// Creates a session for a signed-in user.
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            token: token.into(),
        }
    }

    /// Returns the user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }
}
