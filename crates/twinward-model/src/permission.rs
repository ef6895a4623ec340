use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Well-known permission names. The engine itself treats permissions as
/// opaque values; these exist so callers and the validator agree on spelling.
pub const READ: &str = "READ";
pub const WRITE: &str = "WRITE";
pub const ADMINISTRATE: &str = "ADMINISTRATE";

/// A named capability. Opaque to the engine beyond equality and set
/// membership; ordered so result sets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Permission {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(ParseError::EmptyPermission);
        }
        Ok(Self(input.to_string()))
    }
}

impl TryFrom<String> for Permission {
    type Error = ParseError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        input.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The grant/revoke permission pair attached to one resource path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectedPermissions {
    #[serde(rename = "grant", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub granted: BTreeSet<Permission>,
    #[serde(rename = "revoke", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub revoked: BTreeSet<Permission>,
}

impl EffectedPermissions {
    pub fn granting<I>(permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            granted: permissions.into_iter().map(Permission::new).collect(),
            revoked: BTreeSet::new(),
        }
    }

    pub fn revoking<I>(permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            granted: BTreeSet::new(),
            revoked: permissions.into_iter().map(Permission::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }
}
