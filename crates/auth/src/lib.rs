use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username must not be empty")]
    MissingUsername,

    #[error("API token must not be empty")]
    MissingToken,
}

/// Username and API token presented to the upstream tracker with HTTP Basic auth.
///
/// Built once at startup and shared read-only. The token never shows up in
/// `Debug` output so the value can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Result<Self, AuthError> {
        let username = username.into().trim().to_string();
        let token = token.into().trim().to_string();

        if username.is_empty() {
            return Err(AuthError::MissingUsername);
        }
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        Ok(Self { username, token })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}
