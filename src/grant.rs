//! The permission grant: a domain, a set of actions, and optional
//! constraints, all of which must hold for the grant to imply a request.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::PermitError;
use crate::request::EntityPermission;
use crate::types::{
    ActionType, CommunityConstraint, GroupConstraint, IdConstraint, LocationConstraint,
    PermissionDomain, PropertyConstraint, Subject,
};

fn default_true() -> bool {
    true
}

/// A unit of granted capability: `enabled` gates the whole grant, `domain`
/// and `actions` scope it, and every declared constraint AND-combines during
/// matching. Grants carry no evaluation state; the acting subject is passed
/// into [`Permission::implies`] explicitly, so one grant value can serve
/// concurrent evaluations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub domain: PermissionDomain,
    pub actions: BTreeSet<ActionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_constraint: Option<IdConstraint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub property_constraints: BTreeMap<String, PropertyConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_constraint: Option<GroupConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_constraint: Option<CommunityConstraint>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub location_constraints: SmallVec<[LocationConstraint; 2]>,
}

impl Permission {
    /// Start a fluent builder for a grant in `domain`.
    #[must_use]
    pub fn builder(domain: PermissionDomain) -> PermissionBuilder {
        PermissionBuilder {
            inner: Permission {
                enabled: true,
                domain,
                actions: BTreeSet::new(),
                id_constraint: None,
                property_constraints: BTreeMap::new(),
                group_constraint: None,
                community_constraint: None,
                location_constraints: SmallVec::new(),
            },
        }
    }

    /// Whether the granted action set covers `requested`, applying the
    /// Write-implies-Read rule.
    #[must_use]
    pub fn matches_action(&self, requested: ActionType) -> bool {
        self.actions
            .iter()
            .any(|granted| granted.satisfies(requested))
    }

    /// Whether this grant authorizes `request`, evaluated as `acting`.
    ///
    /// Checks short-circuit in a fixed order: enabled, domain (with the
    /// `All` wildcard), action (Write implies Read), then each declared
    /// constraint against what the request discloses. A declared property,
    /// group, or community constraint is skipped when the request discloses
    /// nothing of that kind; a declared id or location constraint is not —
    /// those fail when the request withholds the fact.
    ///
    /// `acting` is only consulted to resolve `${self}` property values; pass
    /// `None` when no subject context exists and such grants should not
    /// match.
    #[must_use]
    pub fn implies<R>(&self, request: &R, acting: Option<&Subject>) -> bool
    where
        R: EntityPermission + ?Sized,
    {
        if !self.enabled {
            return false;
        }
        if !self.domain.covers(request.domain()) {
            return false;
        }
        if !self.matches_action(request.action()) {
            return false;
        }

        let acting_name = acting.map(|subject| subject.unique_name.as_str());
        for (name, constraint) in &self.property_constraints {
            if let Some(disclosed) = request.property_value(name) {
                if !constraint.satisfies(disclosed, acting_name) {
                    return false;
                }
            }
        }

        if let Some(group_constraint) = &self.group_constraint {
            let disclosed = request.group_constraints();
            if !disclosed.is_empty()
                && !disclosed.iter().any(|group| group_constraint.satisfies(group))
            {
                return false;
            }
        }

        if let Some(community_constraint) = &self.community_constraint {
            let disclosed = request.community_constraints();
            if !disclosed.is_empty()
                && !disclosed
                    .iter()
                    .any(|community| community_constraint.satisfies(community))
            {
                return false;
            }
        }

        if let Some(id_constraint) = &self.id_constraint {
            match request.id() {
                Some(id) if id_constraint.satisfies(id) => {}
                _ => return false,
            }
        }

        if !self.location_constraints.is_empty() {
            let Some(disclosed) = request.location_constraint() else {
                return false;
            };
            if !self
                .location_constraints
                .iter()
                .any(|location| location.satisfies(disclosed))
            {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::resolver::serialize(self))
    }
}

impl FromStr for Permission {
    type Err = PermitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::resolver::resolve(s)
    }
}

/// Fluent builder for [`Permission`].
#[derive(Debug, Clone)]
pub struct PermissionBuilder {
    inner: Permission,
}

impl PermissionBuilder {
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.inner.enabled = enabled;
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionType) -> Self {
        self.inner.actions.insert(action);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: impl IntoIterator<Item = ActionType>) -> Self {
        self.inner.actions.extend(actions);
        self
    }

    #[must_use]
    pub fn id_constraint(mut self, constraint: IdConstraint) -> Self {
        self.inner.id_constraint = Some(constraint);
        self
    }

    /// Declare a property constraint, keyed by its name. Declaring a second
    /// constraint with the same name replaces the first.
    #[must_use]
    pub fn property(mut self, constraint: PropertyConstraint) -> Self {
        self.inner
            .property_constraints
            .insert(constraint.name().to_string(), constraint);
        self
    }

    #[must_use]
    pub fn group(mut self, constraint: GroupConstraint) -> Self {
        self.inner.group_constraint = Some(constraint);
        self
    }

    #[must_use]
    pub fn community(mut self, constraint: CommunityConstraint) -> Self {
        self.inner.community_constraint = Some(constraint);
        self
    }

    #[must_use]
    pub fn location(mut self, constraint: LocationConstraint) -> Self {
        self.inner.location_constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn build(self) -> Permission {
        self.inner
    }
}
