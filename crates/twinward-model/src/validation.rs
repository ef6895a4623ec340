use std::collections::BTreeSet;

use crate::path::{ResourceKey, ResourcePath, ResourceType};
use crate::permission::{Permission, WRITE};
use crate::policy::Policy;

/// Write-time size limits for a policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyLimits {
    pub max_entries: usize,
    pub max_subjects_per_entry: usize,
    pub max_resources_per_entry: usize,
    pub max_path_depth: usize,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_subjects_per_entry: 100,
            max_resources_per_entry: 100,
            max_path_depth: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("too many entries: {count} exceeds limit of {limit}")]
    TooManyEntries { count: usize, limit: usize },

    #[error("too many subjects in entry '{label}': {count} exceeds limit of {limit}")]
    TooManySubjects {
        label: String,
        count: usize,
        limit: usize,
    },

    #[error("too many resources in entry '{label}': {count} exceeds limit of {limit}")]
    TooManyResources {
        label: String,
        count: usize,
        limit: usize,
    },

    #[error("resource path '{path}' in entry '{label}' is too deep: {depth} exceeds limit of {limit}")]
    PathTooDeep {
        label: String,
        path: String,
        depth: usize,
        limit: usize,
    },

    #[error("entry '{label}' has no subjects")]
    NoSubjects { label: String },

    #[error("entry '{label}' has no resources")]
    NoResources { label: String },

    #[error(
        "It must contain at least one permanent Subject with permission(s) <{permissions}> on resource <{resource}>!"
    )]
    NoPermanentAdminSubject { permissions: String, resource: String },
}

/// The resource every valid policy must keep writable: its own root.
fn policy_root() -> ResourceKey {
    ResourceKey::new(ResourceType::new("policy"), ResourcePath::root())
}

fn admin_permissions() -> BTreeSet<Permission> {
    BTreeSet::from([Permission::new(WRITE)])
}

fn format_permissions(permissions: &BTreeSet<Permission>) -> String {
    permissions
        .iter()
        .map(Permission::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Structural checks safe to repeat at compile time: size limits only.
/// Shape errors (malformed keys, empty subject ids) cannot survive parsing.
pub fn validate_structure(
    policy: &Policy,
    limits: &PolicyLimits,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if policy.entries.len() > limits.max_entries {
        errors.push(ValidationError::TooManyEntries {
            count: policy.entries.len(),
            limit: limits.max_entries,
        });
    }

    for entry in &policy.entries {
        if entry.subjects.len() > limits.max_subjects_per_entry {
            errors.push(ValidationError::TooManySubjects {
                label: entry.label.clone(),
                count: entry.subjects.len(),
                limit: limits.max_subjects_per_entry,
            });
        }
        if entry.resources.len() > limits.max_resources_per_entry {
            errors.push(ValidationError::TooManyResources {
                label: entry.label.clone(),
                count: entry.resources.len(),
                limit: limits.max_resources_per_entry,
            });
        }
        for resource in &entry.resources {
            if resource.key.path().depth() > limits.max_path_depth {
                errors.push(ValidationError::PathTooDeep {
                    label: entry.label.clone(),
                    path: resource.key.to_string(),
                    depth: resource.key.path().depth(),
                    limit: limits.max_path_depth,
                });
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Full write-time validation: structure, non-empty entries, and the
/// permanent-admin rule — at least one entry must hold a permanent subject
/// granted WRITE on the policy root, so no policy can lock out all writers.
pub fn validate_policy(policy: &Policy, limits: &PolicyLimits) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_structure(policy, limits) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    for entry in &policy.entries {
        if entry.subjects.is_empty() {
            errors.push(ValidationError::NoSubjects {
                label: entry.label.clone(),
            });
        }
        if entry.resources.is_empty() {
            errors.push(ValidationError::NoResources {
                label: entry.label.clone(),
            });
        }
    }

    let required = admin_permissions();
    let root = policy_root();
    let has_permanent_admin = policy.entries.iter().any(|entry| {
        let grants_admin = entry.resources.iter().any(|resource| {
            resource.key == root && required.iter().all(|p| resource.effected.granted.contains(p))
        });
        grants_admin && entry.subjects.iter().any(|subject| subject.is_permanent())
    });
    if !has_permanent_admin {
        errors.push(ValidationError::NoPermanentAdminSubject {
            permissions: format_permissions(&required),
            resource: root.to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::permission::{EffectedPermissions, READ};
    use crate::policy::{PolicyEntry, PolicyResource};
    use crate::subject::{Subject, SubjectId};

    fn resource(key: &str, granted: &[&str]) -> PolicyResource {
        PolicyResource::new(
            key.parse().unwrap(),
            EffectedPermissions::granting(granted.iter().copied()),
        )
    }

    fn admin_policy() -> Policy {
        Policy::new(vec![PolicyEntry::new(
            "owner",
            vec![Subject::permanent(SubjectId::new("google", "alice"))],
            vec![
                resource("policy:/", &[READ, WRITE]),
                resource("thing:/", &[READ, WRITE]),
            ],
        )])
    }

    #[test]
    fn policy_with_permanent_admin_is_valid() {
        assert!(validate_policy(&admin_policy(), &PolicyLimits::default()).is_ok());
    }

    #[test]
    fn policy_without_policy_root_write_is_rejected() {
        let policy = Policy::new(vec![PolicyEntry::new(
            "owner",
            vec![Subject::permanent(SubjectId::new("google", "alice"))],
            vec![resource("thing:/", &[READ, WRITE])],
        )]);

        let errors = validate_policy(&policy, &PolicyLimits::default()).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "It must contain at least one permanent Subject with permission(s) <WRITE> on resource <policy:/>!"
        );
    }

    #[test]
    fn policy_with_only_expiring_subjects_is_rejected() {
        let expiry = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let policy = Policy::new(vec![PolicyEntry::new(
            "temporary",
            vec![Subject::expiring(SubjectId::new("google", "carol"), expiry)],
            vec![resource("policy:/", &[READ, WRITE])],
        )]);

        let errors = validate_policy(&policy, &PolicyLimits::default()).unwrap_err();

        assert!(matches!(
            errors[0],
            ValidationError::NoPermanentAdminSubject { .. }
        ));
    }

    #[test]
    fn admin_grant_and_permanent_subject_must_share_an_entry() {
        let expiry = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let policy = Policy::new(vec![
            PolicyEntry::new(
                "temporary-admin",
                vec![Subject::expiring(SubjectId::new("google", "carol"), expiry)],
                vec![resource("policy:/", &[WRITE])],
            ),
            PolicyEntry::new(
                "permanent-reader",
                vec![Subject::permanent(SubjectId::new("google", "alice"))],
                vec![resource("thing:/", &[READ])],
            ),
        ]);

        let errors = validate_policy(&policy, &PolicyLimits::default()).unwrap_err();

        assert!(matches!(
            errors[0],
            ValidationError::NoPermanentAdminSubject { .. }
        ));
    }

    #[test]
    fn empty_policy_is_rejected() {
        let errors = validate_policy(&Policy::default(), &PolicyLimits::default()).unwrap_err();

        assert!(matches!(
            errors[0],
            ValidationError::NoPermanentAdminSubject { .. }
        ));
    }

    #[test]
    fn entry_without_subjects_is_rejected() {
        let mut policy = admin_policy();
        policy
            .entries
            .push(PolicyEntry::new("empty", vec![], vec![resource("thing:/", &[READ])]));

        let errors = validate_policy(&policy, &PolicyLimits::default()).unwrap_err();

        assert!(errors.contains(&ValidationError::NoSubjects {
            label: "empty".to_string()
        }));
    }

    #[test]
    fn entry_without_resources_is_rejected() {
        let mut policy = admin_policy();
        policy.entries.push(PolicyEntry::new(
            "empty",
            vec![Subject::permanent(SubjectId::new("google", "dan"))],
            vec![],
        ));

        let errors = validate_policy(&policy, &PolicyLimits::default()).unwrap_err();

        assert!(errors.contains(&ValidationError::NoResources {
            label: "empty".to_string()
        }));
    }

    #[test]
    fn exceeding_max_entries_rejected() {
        let entries = (0..3)
            .map(|i| {
                PolicyEntry::new(
                    format!("entry-{i}"),
                    vec![Subject::permanent(SubjectId::new("google", "alice"))],
                    vec![resource("policy:/", &[WRITE])],
                )
            })
            .collect();
        let policy = Policy::new(entries);
        let limits = PolicyLimits {
            max_entries: 2,
            ..Default::default()
        };

        let errors = validate_structure(&policy, &limits).unwrap_err();

        assert_eq!(
            errors,
            vec![ValidationError::TooManyEntries { count: 3, limit: 2 }]
        );
    }

    #[test]
    fn exceeding_max_path_depth_rejected() {
        let policy = Policy::new(vec![PolicyEntry::new(
            "deep",
            vec![Subject::permanent(SubjectId::new("google", "alice"))],
            vec![resource("thing:/a/b/c", &[READ])],
        )]);
        let limits = PolicyLimits {
            max_path_depth: 2,
            ..Default::default()
        };

        let errors = validate_structure(&policy, &limits).unwrap_err();

        assert!(matches!(
            &errors[0],
            ValidationError::PathTooDeep { label, depth: 3, limit: 2, .. } if label == "deep"
        ));
    }

    #[test]
    fn structure_check_ignores_admin_rule() {
        let policy = Policy::new(vec![PolicyEntry::new(
            "reader",
            vec![Subject::permanent(SubjectId::new("google", "bob"))],
            vec![resource("thing:/features", &[READ])],
        )]);

        assert!(validate_structure(&policy, &PolicyLimits::default()).is_ok());
    }
}
