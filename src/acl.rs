//! Per-object access control lists: ordered subject→grant bindings.
//!
//! The element list is the single authoritative representation. The
//! `&`-joined string form used by the fixed-width storage column is computed
//! on demand by [`RecordSharingAcl::to_acl_string`] and reloaded by
//! [`RecordSharingAcl::from_acl_string`]; there is no cached copy to keep in
//! sync.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONSTRAINT_DELIMITER, KEY_VALUE_DELIMITER, LIST_DELIMITER, MAX_ACL_STRING_LEN, PART_DELIMITER,
    ROLE_SUFFIX_CLOSE, ROLE_SUFFIX_OPEN,
};
use crate::error::{PermitError, Result};
use crate::grant::Permission;
use crate::resolver;
use crate::types::{ActionType, PermissionDomain, Subject};

/// One subject→grant binding. Immutable; equality and hashing are value-based
/// on both fields, which is what ACL deduplication and set operations rely
/// on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AclElement {
    subject_name: String,
    grant_string: String,
}

impl AclElement {
    #[must_use]
    pub fn new(subject_name: impl Into<String>, grant_string: impl Into<String>) -> Self {
        Self {
            subject_name: subject_name.into(),
            grant_string: grant_string.into(),
        }
    }

    /// Subject unique name, possibly carrying an embedded `[ROLE,...]`
    /// restriction when the subject is a group.
    #[must_use]
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    #[must_use]
    pub fn grant_string(&self) -> &str {
        &self.grant_string
    }

    /// Parse this element's grant. Failures are data-integrity events: the
    /// stored string is static persisted data, so the error is logged and
    /// surfaced rather than retried or defaulted.
    pub fn resolve_grant(&self) -> Result<Permission> {
        resolver::resolve(&self.grant_string).inspect_err(|error| {
            tracing::error!(
                subject = %self.subject_name,
                grant = %self.grant_string,
                %error,
                "malformed persisted grant string"
            );
        })
    }
}

/// Build the ACL subject name for a group grant scoped to `roles`. An empty
/// role list yields the bare group name (grant applies to every member).
/// Group unique names never contain `[` or `]`, which is what makes the
/// suffix recoverable.
#[must_use]
pub fn role_restricted_subject(group_name: &str, roles: &[&str]) -> String {
    if roles.is_empty() {
        return group_name.to_string();
    }
    format!(
        "{group_name}{ROLE_SUFFIX_OPEN}{}{ROLE_SUFFIX_CLOSE}",
        roles.join(",")
    )
}

/// How an ACL subject name relates to one group.
enum RoleScope {
    /// Subject is the bare group name: every member qualifies.
    Unrestricted,
    /// Subject carries a role suffix: only members holding one of these
    /// roles qualify.
    Roles(Vec<String>),
}

/// Match `subject_name` against a group, decoding any role suffix. A subject
/// that merely starts with the group name but continues with something other
/// than a well-formed `[...]` suffix (e.g. a longer group name) does not
/// match.
fn role_scope(subject_name: &str, group_name: &str) -> Option<RoleScope> {
    let remainder = subject_name.strip_prefix(group_name)?;
    if remainder.is_empty() {
        return Some(RoleScope::Unrestricted);
    }
    let roles = remainder
        .strip_prefix(ROLE_SUFFIX_OPEN)?
        .strip_suffix(ROLE_SUFFIX_CLOSE)?;
    Some(RoleScope::Roles(
        roles
            .split(LIST_DELIMITER)
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .collect(),
    ))
}

/// Role list embedded in a subject name, regardless of which group it names.
fn embedded_roles(subject_name: &str) -> Option<Vec<&str>> {
    let open = subject_name.find(ROLE_SUFFIX_OPEN)?;
    let inner = subject_name[open..]
        .strip_prefix(ROLE_SUFFIX_OPEN)?
        .strip_suffix(ROLE_SUFFIX_CLOSE)?;
    Some(inner.split(LIST_DELIMITER).map(str::trim).collect())
}

/// Ordered collection of [`AclElement`] attached to one securable object.
/// Answers "is subject U permitted to do action A" by lazily resolving the
/// stored grant strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RecordSharingAcl {
    elements: Vec<AclElement>,
}

impl RecordSharingAcl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `grant` to `subject_name`. Returns false (and leaves the ACL
    /// unchanged) when an element with the same subject and grant string is
    /// already present.
    pub fn add_element(&mut self, subject_name: impl Into<String>, grant: &Permission) -> bool {
        self.add_raw_element(AclElement::new(subject_name, resolver::serialize(grant)))
    }

    /// Add an already-serialized binding, deduplicating by value.
    pub fn add_raw_element(&mut self, element: AclElement) -> bool {
        if self.elements.contains(&element) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Remove one element by value. Returns whether anything was removed.
    pub fn remove_element(&mut self, element: &AclElement) -> bool {
        match self.elements.iter().position(|existing| existing == element) {
            Some(index) => {
                self.elements.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    #[must_use]
    pub fn num_permissions(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn elements(&self) -> &[AclElement] {
        &self.elements
    }

    /// Whether `user` may perform `action` under any element of this ACL.
    ///
    /// Elements are tried in order. A direct subject-name match resolves the
    /// stored grant and applies the Write-implies-Read action rule; group
    /// elements additionally require the user to hold one of the embedded
    /// roles (or any role, for an unrestricted group subject). Semantic
    /// mismatches are `Ok(false)`; only malformed stored grants error.
    pub fn is_permitted(&self, user: &Subject, action: ActionType) -> Result<bool> {
        for element in &self.elements {
            if element.subject_name == user.unique_name {
                if element.resolve_grant()?.matches_action(action) {
                    return Ok(true);
                }
                continue;
            }
            for membership in &user.memberships {
                let qualifies = match role_scope(&element.subject_name, &membership.group_name) {
                    Some(RoleScope::Unrestricted) => true,
                    Some(RoleScope::Roles(roles)) => roles.contains(&membership.role),
                    None => false,
                };
                if qualifies && element.resolve_grant()?.matches_action(action) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Set-union with `other`: append its elements, skipping value
    /// duplicates.
    pub fn union(&mut self, other: &RecordSharingAcl) {
        for element in &other.elements {
            if !self.elements.contains(element) {
                self.elements.push(element.clone());
            }
        }
    }

    /// Elements present in both ACLs, in this ACL's order.
    #[must_use]
    pub fn intersection(&self, other: &RecordSharingAcl) -> Vec<AclElement> {
        self.elements
            .iter()
            .filter(|element| other.elements.contains(element))
            .cloned()
            .collect()
    }

    /// Remove every element bound to exactly `subject_name`, returning the
    /// removed set. Role-restricted variants of a group subject are distinct
    /// subject names and are not touched.
    pub fn remove_elements_for(&mut self, subject_name: &str) -> Vec<AclElement> {
        let mut removed = Vec::new();
        self.elements.retain(|element| {
            if element.subject_name == subject_name {
                removed.push(element.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Remove role-restricted group elements whose embedded role set
    /// intersects `roles`, returning the removed set. Unrestricted elements
    /// are never touched.
    pub fn remove_elements_for_roles(&mut self, roles: &[&str]) -> Vec<AclElement> {
        let mut removed = Vec::new();
        self.elements.retain(|element| {
            let matches = embedded_roles(&element.subject_name)
                .is_some_and(|embedded| embedded.iter().any(|role| roles.contains(role)));
            if matches {
                removed.push(element.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Serialize to the persisted `&`-joined `subject=grantString` form.
    /// Emits a warning when the result no longer fits the storage column.
    #[must_use]
    pub fn to_acl_string(&self) -> String {
        let text = self
            .elements
            .iter()
            .map(|element| {
                format!(
                    "{}{KEY_VALUE_DELIMITER}{}",
                    element.subject_name, element.grant_string
                )
            })
            .collect::<Vec<String>>()
            .join("&");
        if text.len() > MAX_ACL_STRING_LEN {
            tracing::warn!(
                len = text.len(),
                limit = MAX_ACL_STRING_LEN,
                "serialized ACL exceeds storage bound"
            );
        }
        text
    }

    /// Reload an ACL from its persisted string form.
    ///
    /// Grant strings themselves contain `&` between constraint tokens, so
    /// after splitting, a token starts a new element only when the text after
    /// its first `=` leads with a valid domain token and `:`; anything else
    /// is a continuation of the previous element's grant string. Reserved
    /// characters make this unambiguous: no constraint value may contain `:`.
    pub fn from_acl_string(text: &str) -> Result<Self> {
        let mut acl = RecordSharingAcl::new();
        if text.is_empty() {
            return Ok(acl);
        }
        for token in text.split(CONSTRAINT_DELIMITER) {
            if let Some((subject, grant)) = split_element_token(token) {
                acl.elements.push(AclElement::new(subject, grant));
            } else if let Some(last) = acl.elements.last_mut() {
                last.grant_string.push(CONSTRAINT_DELIMITER);
                last.grant_string.push_str(token);
            } else {
                tracing::error!(entry = %token, "ACL string starts with a dangling token");
                return Err(PermitError::MalformedAclEntry {
                    entry: token.to_string(),
                });
            }
        }
        Ok(acl)
    }
}

/// Split `subject=DOMAIN:...` into subject and grant, or report that the
/// token is a grant-string continuation.
fn split_element_token(token: &str) -> Option<(&str, &str)> {
    let (subject, grant) = token.split_once(KEY_VALUE_DELIMITER)?;
    let (domain, _) = grant.split_once(PART_DELIMITER)?;
    domain.parse::<PermissionDomain>().ok()?;
    Some((subject, grant))
}
