use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use twinward_model::{Permission, ResourceKey, SubjectId};

use crate::resolve::{SubjectState, apply_node};
use crate::tree::{PolicyTree, ResourceNode};

/// Redacts `document` (rooted at `key`) down to the fields for which at least
/// one of `subjects` holds `permission`. The document and the tree are walked
/// in lock-step; once the tree runs out below a branch, the states inherited
/// from the deepest existing node decide for everything underneath.
///
/// The result is always a structural subset of the input, and filtering is
/// idempotent. Arrays and scalars are leaves: kept or dropped whole.
pub(crate) fn build_view(
    tree: &PolicyTree,
    document: &Value,
    key: &ResourceKey,
    subjects: &BTreeSet<SubjectId>,
    permission: &Permission,
    at: DateTime<Utc>,
) -> Value {
    let mut states: HashMap<&SubjectId, SubjectState> = HashMap::new();
    let mut node = tree.root(key.resource_type());
    if let Some(n) = node {
        apply_node(n, permission, at, &mut states);
    }
    for segment in key.path().segments() {
        node = node.and_then(|n| n.child(segment));
        if let Some(n) = node {
            apply_node(n, permission, at, &mut states);
        }
    }

    match filter_value(document, node, &states, subjects, permission, at) {
        Some(filtered) => filtered,
        None if document.is_object() => Value::Object(Map::new()),
        None => Value::Null,
    }
}

fn any_granted(states: &HashMap<&SubjectId, SubjectState>, subjects: &BTreeSet<SubjectId>) -> bool {
    subjects
        .iter()
        .any(|subject| states.get(subject) == Some(&SubjectState::Granted))
}

fn filter_value<'t>(
    value: &Value,
    node: Option<&'t ResourceNode>,
    states: &HashMap<&'t SubjectId, SubjectState>,
    subjects: &BTreeSet<SubjectId>,
    permission: &Permission,
    at: DateTime<Utc>,
) -> Option<Value> {
    match value {
        Value::Object(fields) => {
            let mut kept = Map::new();
            for (name, field_value) in fields {
                let child_node = node.and_then(|n| n.child(name));
                let mut child_states = states.clone();
                if let Some(n) = child_node {
                    apply_node(n, permission, at, &mut child_states);
                }
                if let Some(filtered) =
                    filter_value(field_value, child_node, &child_states, subjects, permission, at)
                {
                    kept.insert(name.clone(), filtered);
                }
            }
            // An object survives if any field survived, or if it is readable
            // itself (an explicitly granted empty object stays visible).
            if !kept.is_empty() || any_granted(states, subjects) {
                Some(Value::Object(kept))
            } else {
                None
            }
        }
        leaf => any_granted(states, subjects).then(|| leaf.clone()),
    }
}
