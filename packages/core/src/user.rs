//! User identity as consumed from the auth collaborator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque user id issued by the auth provider.
///
/// Used as the partition key for every per-user record, both remote and in
/// the local cache, so it must be safe to embed in a storage key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserIdError {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id contains invalid character {0:?}")]
    InvalidChar(char),
}

impl UserId {
    /// Parse a user id.
    pub fn parse(s: &str) -> Result<Self, UserIdError> {
        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        if let Some(c) = s
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\'))
        {
            return Err(UserIdError::InvalidChar(c));
        }
        if s.starts_with('.') {
            return Err(UserIdError::InvalidChar('.'));
        }
        Ok(Self(s.to_string()))
    }

    /// Build an id from a literal known to be valid.
    pub(crate) fn from_static(s: &'static str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsafe_ids() {
        assert_eq!(UserId::parse(""), Err(UserIdError::Empty));
        assert_eq!(UserId::parse("a/b"), Err(UserIdError::InvalidChar('/')));
        assert_eq!(UserId::parse("a b"), Err(UserIdError::InvalidChar(' ')));
        assert_eq!(UserId::parse("..x"), Err(UserIdError::InvalidChar('.')));
        assert_eq!(UserId::parse("uid_42").unwrap().as_str(), "uid_42");
    }

    #[test]
    fn deserialize_validates() {
        let ok: UserId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }
}
