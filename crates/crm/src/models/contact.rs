//! Contact records as they exist in the CRM

use serde::{Deserialize, Serialize};

/// CRM record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The first CRM contact matching a natural key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: ContactId,
    /// Full name currently stored in the CRM (empty if the CRM had none)
    pub current_name: String,
}

impl RemoteRecord {
    pub fn new(id: impl Into<ContactId>, current_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_name: current_name.into(),
        }
    }
}

/// A display name split into the CRM's first/last name fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

impl NameParts {
    /// Split on whitespace: the first token is the first name, the rest
    /// (re-joined with single spaces) is the last name.
    pub fn split(display_name: &str) -> Self {
        let mut tokens = display_name.split_whitespace();
        let first = tokens.next().unwrap_or_default().to_string();
        let last = tokens.collect::<Vec<_>>().join(" ");
        Self { first, last }
    }
}
