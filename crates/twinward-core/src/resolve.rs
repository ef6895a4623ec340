use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use twinward_model::{Permission, PointerLocation, ResourceKey, ResourcePath, SubjectId};

use crate::tree::{PolicyTree, ResourceNode};

/// The outcome of a full-path resolution: every subject whose final state is
/// granted or revoked for the queried permission. Subjects the path never
/// mentions appear in neither set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectedSubjectIds {
    pub granted: BTreeSet<SubjectId>,
    pub revoked: BTreeSet<SubjectId>,
}

impl EffectedSubjectIds {
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }
}

/// Running state of one subject while descending toward the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubjectState {
    Granted,
    Revoked,
}

/// Folds one node's explicit entries into the running states. The revoked set
/// is consulted first: an explicit revoke beats a simultaneous grant at the
/// same node. Subjects without an entry here keep their inherited state.
pub(crate) fn apply_node<'t>(
    node: &'t ResourceNode,
    permission: &Permission,
    at: DateTime<Utc>,
    states: &mut HashMap<&'t SubjectId, SubjectState>,
) {
    for (subject, permissions) in node.subjects() {
        if permissions.revokes(permission) {
            states.insert(subject, SubjectState::Revoked);
        } else if permissions.grants_at(permission, at) {
            states.insert(subject, SubjectState::Granted);
        }
    }
}

/// Full-path resolution: a single downward pass from the resource type root
/// toward `key`, visiting only nodes located at or above the target. If the
/// tree ends before the target path does, the deepest existing ancestor
/// decides; unspecified deeper segments never change the outcome.
pub(crate) fn resolve(
    tree: &PolicyTree,
    key: &ResourceKey,
    permission: &Permission,
    at: DateTime<Utc>,
) -> EffectedSubjectIds {
    let mut states: HashMap<&SubjectId, SubjectState> = HashMap::new();
    if let Some(root) = tree.root(key.resource_type()) {
        visit(root, &ResourcePath::root(), key.path(), permission, at, &mut states);
    }

    let mut effected = EffectedSubjectIds::default();
    for (subject, state) in states {
        match state {
            SubjectState::Granted => effected.granted.insert(subject.clone()),
            SubjectState::Revoked => effected.revoked.insert(subject.clone()),
        };
    }
    effected
}

fn visit<'t>(
    node: &'t ResourceNode,
    node_path: &ResourcePath,
    target: &ResourcePath,
    permission: &Permission,
    at: DateTime<Utc>,
    states: &mut HashMap<&'t SubjectId, SubjectState>,
) {
    match target.locate(node_path) {
        // Lateral branches and nodes deeper than the target never influence it.
        PointerLocation::Different | PointerLocation::Below => {}
        PointerLocation::Same => apply_node(node, permission, at, states),
        PointerLocation::Above => {
            apply_node(node, permission, at, states);
            for (segment, child) in node.children() {
                visit(child, &node_path.child(segment), target, permission, at, states);
            }
        }
    }
}

/// Partial-permission lookup: evaluated only at the exact node for `key`,
/// without ancestor inheritance. A subject qualifies when every requested
/// permission is granted here and none is revoked here.
pub(crate) fn resolve_partial(
    tree: &PolicyTree,
    key: &ResourceKey,
    permissions: &BTreeSet<Permission>,
    at: DateTime<Utc>,
) -> BTreeSet<SubjectId> {
    if permissions.is_empty() {
        return BTreeSet::new();
    }
    let Some(node) = tree.node_at(key) else {
        return BTreeSet::new();
    };
    node.subjects()
        .filter(|(_, held)| held.grants_all_at(permissions, at) && !held.revokes_any(permissions))
        .map(|(subject, _)| subject.clone())
        .collect()
}
