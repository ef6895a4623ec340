use serde::{Deserialize, Serialize};

use crate::path::ResourceKey;
use crate::permission::EffectedPermissions;
use crate::subject::Subject;

/// One resource-scoped grant/revoke mapping inside a policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResource {
    #[serde(rename = "resourceKey")]
    pub key: ResourceKey,
    #[serde(flatten)]
    pub effected: EffectedPermissions,
}

impl PolicyResource {
    pub fn new(key: ResourceKey, effected: EffectedPermissions) -> Self {
        Self { key, effected }
    }
}

/// A labelled group of subjects and the resource permissions they share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub label: String,
    pub subjects: Vec<Subject>,
    pub resources: Vec<PolicyResource>,
}

impl PolicyEntry {
    pub fn new(
        label: impl Into<String>,
        subjects: Vec<Subject>,
        resources: Vec<PolicyResource>,
    ) -> Self {
        Self {
            label: label.into(),
            subjects,
            resources,
        }
    }
}

/// The declarative authorization document for one entity. Multiple entries
/// contribute to the same compiled tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub entries: Vec<PolicyEntry>,
}

impl Policy {
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    pub fn entry(&self, label: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }
}
