use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use twinward_model::{
    Permission, Policy, PolicyLimits, ResourceKey, ResourceType, SubjectId, ValidationError,
    validate_structure,
};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid policy: {}", format_validation_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// How long a granted permission stays effective. Merging contributions from
/// several entries keeps the most permissive outcome: permanent absorbs any
/// expiry, two expiries keep the later one. The merge is commutative and
/// associative, so entry order never shows in the compiled tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Permanent,
    Until(DateTime<Utc>),
}

impl Validity {
    pub fn of(expiry: Option<DateTime<Utc>>) -> Self {
        match expiry {
            None => Self::Permanent,
            Some(instant) => Self::Until(instant),
        }
    }

    pub fn in_force_at(&self, at: DateTime<Utc>) -> bool {
        match self {
            Self::Permanent => true,
            Self::Until(expiry) => at < *expiry,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Permanent, _) | (_, Self::Permanent) => Self::Permanent,
            (Self::Until(a), Self::Until(b)) => Self::Until(a.max(b)),
        }
    }
}

/// The permission state one subject holds exactly at one resource node.
/// Grants carry their validity; revokes are not expiry-gated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectPermissions {
    granted: BTreeMap<Permission, Validity>,
    revoked: BTreeSet<Permission>,
}

impl SubjectPermissions {
    fn add_grant(&mut self, permission: Permission, validity: Validity) {
        self.granted
            .entry(permission)
            .and_modify(|existing| *existing = existing.merge(validity))
            .or_insert(validity);
    }

    fn add_revoke(&mut self, permission: Permission) {
        self.revoked.insert(permission);
    }

    pub fn grants_at(&self, permission: &Permission, at: DateTime<Utc>) -> bool {
        self.granted
            .get(permission)
            .is_some_and(|validity| validity.in_force_at(at))
    }

    pub fn revokes(&self, permission: &Permission) -> bool {
        self.revoked.contains(permission)
    }

    pub fn grants_all_at(&self, permissions: &BTreeSet<Permission>, at: DateTime<Utc>) -> bool {
        permissions.iter().all(|p| self.grants_at(p, at))
    }

    pub fn revokes_any(&self, permissions: &BTreeSet<Permission>) -> bool {
        permissions.iter().any(|p| self.revokes(p))
    }
}

/// One path segment of the compiled tree: children by segment name, plus the
/// per-subject permission state effective exactly here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceNode {
    subjects: HashMap<SubjectId, SubjectPermissions>,
    children: HashMap<String, ResourceNode>,
}

impl ResourceNode {
    pub fn child(&self, segment: &str) -> Option<&ResourceNode> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ResourceNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn subjects(&self) -> impl Iterator<Item = (&SubjectId, &SubjectPermissions)> {
        self.subjects.iter()
    }

    pub fn subject(&self, id: &SubjectId) -> Option<&SubjectPermissions> {
        self.subjects.get(id)
    }
}

/// The immutable compiled form of one policy revision: one root node per
/// resource type. Built once, then only read; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTree {
    roots: HashMap<ResourceType, ResourceNode>,
}

impl PolicyTree {
    /// Compiles all policy entries into one tree, unioning grants and revokes
    /// per (path, subject). Merge order is never observable. Expired subjects
    /// are kept; expiry is a query-time concern.
    pub fn compile(policy: &Policy) -> Result<Self, CompileError> {
        Self::compile_with_limits(policy, &PolicyLimits::default())
    }

    pub fn compile_with_limits(
        policy: &Policy,
        limits: &PolicyLimits,
    ) -> Result<Self, CompileError> {
        validate_structure(policy, limits).map_err(CompileError::Invalid)?;

        let mut roots: HashMap<ResourceType, ResourceNode> = HashMap::new();
        for entry in &policy.entries {
            for resource in &entry.resources {
                let mut node = roots.entry(resource.key.resource_type().clone()).or_default();
                for segment in resource.key.path().segments() {
                    node = node.children.entry(segment.to_string()).or_default();
                }
                for subject in &entry.subjects {
                    let permissions = node.subjects.entry(subject.id.clone()).or_default();
                    let validity = Validity::of(subject.expiry);
                    for permission in &resource.effected.granted {
                        permissions.add_grant(permission.clone(), validity);
                    }
                    for permission in &resource.effected.revoked {
                        permissions.add_revoke(permission.clone());
                    }
                }
            }
        }

        debug!(entries = policy.entries.len(), roots = roots.len(), "compiled policy tree");
        Ok(Self { roots })
    }

    pub fn root(&self, resource_type: &ResourceType) -> Option<&ResourceNode> {
        self.roots.get(resource_type)
    }

    /// The node addressed exactly by `key`, if the tree has one.
    pub fn node_at(&self, key: &ResourceKey) -> Option<&ResourceNode> {
        let mut node = self.root(key.resource_type())?;
        for segment in key.path().segments() {
            node = node.child(segment)?;
        }
        Some(node)
    }
}
