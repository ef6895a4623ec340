use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::trace;

use twinward_model::{Permission, Policy, PolicyLimits, ResourceKey, SubjectId};

use crate::resolve::{EffectedSubjectIds, resolve, resolve_partial};
use crate::tree::{CompileError, PolicyTree};
use crate::view::build_view;

/// The compiled, immutable query surface for one policy revision. Cheap to
/// share by reference across any number of threads; a policy change means
/// compiling a brand-new `Enforcer`, never mutating this one.
///
/// Every query has a pure `*_at` variant taking the evaluation instant used
/// to filter expired grants; the plain variants read the clock once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcer {
    tree: PolicyTree,
}

impl Enforcer {
    pub fn compile(policy: &Policy) -> Result<Self, CompileError> {
        Ok(Self {
            tree: PolicyTree::compile(policy)?,
        })
    }

    pub fn compile_with_limits(policy: &Policy, limits: &PolicyLimits) -> Result<Self, CompileError> {
        Ok(Self {
            tree: PolicyTree::compile_with_limits(policy, limits)?,
        })
    }

    pub fn from_tree(tree: PolicyTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &PolicyTree {
        &self.tree
    }

    /// True iff at least one of `subjects` resolves to granted for
    /// `permission` at `key`. Revocation already dominates inside resolution,
    /// so a revoked subject can never slip through via a second identity.
    /// Unknown resource types fail closed.
    pub fn has_permission(
        &self,
        key: &ResourceKey,
        permission: &Permission,
        subjects: &BTreeSet<SubjectId>,
    ) -> bool {
        self.has_permission_at(key, permission, subjects, Utc::now())
    }

    pub fn has_permission_at(
        &self,
        key: &ResourceKey,
        permission: &Permission,
        subjects: &BTreeSet<SubjectId>,
        at: DateTime<Utc>,
    ) -> bool {
        let effected = resolve(&self.tree, key, permission, at);
        let granted = subjects.iter().any(|s| effected.granted.contains(s));
        trace!(%key, %permission, granted, "permission check");
        granted
    }

    /// The raw resolution result for diagnostics and subject listing.
    pub fn subject_ids_with_permission(
        &self,
        key: &ResourceKey,
        permission: &Permission,
    ) -> EffectedSubjectIds {
        self.subject_ids_with_permission_at(key, permission, Utc::now())
    }

    pub fn subject_ids_with_permission_at(
        &self,
        key: &ResourceKey,
        permission: &Permission,
        at: DateTime<Utc>,
    ) -> EffectedSubjectIds {
        resolve(&self.tree, key, permission, at)
    }

    /// Subjects holding every permission in `permissions` directly at the
    /// node for `key` (no ancestor inheritance); empty if the node does not
    /// exist.
    pub fn subject_ids_with_partial_permission(
        &self,
        key: &ResourceKey,
        permissions: &BTreeSet<Permission>,
    ) -> BTreeSet<SubjectId> {
        self.subject_ids_with_partial_permission_at(key, permissions, Utc::now())
    }

    pub fn subject_ids_with_partial_permission_at(
        &self,
        key: &ResourceKey,
        permissions: &BTreeSet<Permission>,
        at: DateTime<Utc>,
    ) -> BTreeSet<SubjectId> {
        resolve_partial(&self.tree, key, permissions, at)
    }

    /// Filters `document` (rooted at `key`) down to what `subjects` may see.
    pub fn build_json_view(
        &self,
        document: &Value,
        key: &ResourceKey,
        subjects: &BTreeSet<SubjectId>,
        permission: &Permission,
    ) -> Value {
        self.build_json_view_at(document, key, subjects, permission, Utc::now())
    }

    pub fn build_json_view_at(
        &self,
        document: &Value,
        key: &ResourceKey,
        subjects: &BTreeSet<SubjectId>,
        permission: &Permission,
        at: DateTime<Utc>,
    ) -> Value {
        build_view(&self.tree, document, key, subjects, permission, at)
    }
}
