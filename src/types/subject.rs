//! The acting subject: who an evaluation runs as.
//!
//! A `Subject` is threaded through `implies` and `is_permitted` explicitly
//! instead of riding on ambient or grant-local state, so permission values
//! stay shareable across concurrent evaluations.

use serde::{Deserialize, Serialize};

/// Membership of one group, with the role held inside that group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMembership {
    pub group_name: String,
    pub role: String,
}

impl GroupMembership {
    #[must_use]
    pub fn new(group_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            role: role.into(),
        }
    }
}

/// A user as the resolution engine sees one: a unique name plus group
/// memberships. Securable-object plumbing lives elsewhere; this is the whole
/// contract the engine needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Subject {
    pub unique_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<GroupMembership>,
}

impl Subject {
    #[must_use]
    pub fn new(unique_name: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            memberships: Vec::new(),
        }
    }

    /// Add a group membership, builder style.
    #[must_use]
    pub fn member_of(mut self, group_name: impl Into<String>, role: impl Into<String>) -> Self {
        self.memberships
            .push(GroupMembership::new(group_name, role));
        self
    }

    /// The role this subject holds in `group_name`, if a member.
    #[must_use]
    pub fn role_in(&self, group_name: &str) -> Option<&str> {
        self.memberships
            .iter()
            .find(|membership| membership.group_name == group_name)
            .map(|membership| membership.role.as_str())
    }
}
