use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the user who owns a session and its stored records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request context handed to every persistence call.
///
/// Authentication happens before this is built; the core only trusts the
/// owner it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub owner: OwnerId,
}

impl SessionContext {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: OwnerId::new(owner),
        }
    }

    /// True when `owner` is the caller.
    pub fn owns(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }
}
