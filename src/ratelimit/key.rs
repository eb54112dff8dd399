//! Client identity keys.

use std::fmt;

/// A key that identifies the client owning a bucket.
///
/// Callers that track clients by numeric id and callers that use string
/// identities (API keys, user names, addresses) can share one limiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClientKey {
    /// Numeric identity, e.g. a chat or account id
    Id(i64),
    /// String identity
    Name(String),
}

impl From<i64> for ClientKey {
    fn from(id: i64) -> Self {
        ClientKey::Id(id)
    }
}

impl From<&str> for ClientKey {
    fn from(name: &str) -> Self {
        ClientKey::Name(name.to_string())
    }
}

impl From<String> for ClientKey {
    fn from(name: String) -> Self {
        ClientKey::Name(name)
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::Id(id) => write!(f, "id:{}", id),
            ClientKey::Name(name) => write!(f, "name:{}", name),
        }
    }
}
