//! The permission-request contract and a concrete owned request.
//!
//! Adapters around securable objects (records, folders, forms, groups,
//! communities) implement [`EntityPermission`] to disclose the facts a grant
//! may test. Disclosure is voluntary: a property or location the adapter does
//! not expose is simply not tested, except where the grant explicitly
//! requires one (ids and locations).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ActionType, CommunityConstraint, GroupConstraint, LocationConstraint, PermissionDomain,
    PropertyConstraint,
};

/// What a securable object exposes to be matched against a grant: the domain
/// it lives in, the single action being requested, and whatever id, property,
/// group, community, and location facts it is willing to disclose.
pub trait EntityPermission {
    fn domain(&self) -> PermissionDomain;
    fn action(&self) -> ActionType;
    fn id(&self) -> Option<i64>;
    fn has_property(&self, name: &str) -> bool;
    fn property_value(&self, name: &str) -> Option<&PropertyConstraint>;
    fn group_constraints(&self) -> &[GroupConstraint];
    fn community_constraints(&self) -> &[CommunityConstraint];
    fn location_constraint(&self) -> Option<&LocationConstraint>;
}

/// Owned, buildable [`EntityPermission`] implementation. Adapters that load
/// entities from storage can assemble one of these instead of implementing
/// the trait directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionRequest {
    domain: PermissionDomain,
    action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    groups: Vec<GroupConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    communities: Vec<CommunityConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<LocationConstraint>,
}

impl PermissionRequest {
    /// Start a fluent builder for a request in `domain` asking for `action`.
    #[must_use]
    pub fn builder(domain: PermissionDomain, action: ActionType) -> PermissionRequestBuilder {
        PermissionRequestBuilder {
            inner: PermissionRequest {
                domain,
                action,
                id: None,
                properties: BTreeMap::new(),
                groups: Vec::new(),
                communities: Vec::new(),
                location: None,
            },
        }
    }
}

impl EntityPermission for PermissionRequest {
    fn domain(&self) -> PermissionDomain {
        self.domain
    }

    fn action(&self) -> ActionType {
        self.action
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    fn property_value(&self, name: &str) -> Option<&PropertyConstraint> {
        self.properties.get(name)
    }

    fn group_constraints(&self) -> &[GroupConstraint] {
        &self.groups
    }

    fn community_constraints(&self) -> &[CommunityConstraint] {
        &self.communities
    }

    fn location_constraint(&self) -> Option<&LocationConstraint> {
        self.location.as_ref()
    }
}

/// Fluent builder for [`PermissionRequest`].
#[derive(Debug, Clone)]
pub struct PermissionRequestBuilder {
    inner: PermissionRequest,
}

impl PermissionRequestBuilder {
    #[must_use]
    pub fn id(mut self, id: i64) -> Self {
        self.inner.id = Some(id);
        self
    }

    /// Disclose a property value under `name`.
    #[must_use]
    pub fn property(mut self, property: PropertyConstraint) -> Self {
        self.inner
            .properties
            .insert(property.name().to_string(), property);
        self
    }

    #[must_use]
    pub fn group(mut self, group: GroupConstraint) -> Self {
        self.inner.groups.push(group);
        self
    }

    #[must_use]
    pub fn community(mut self, community: CommunityConstraint) -> Self {
        self.inner.communities.push(community);
        self
    }

    #[must_use]
    pub fn location(mut self, location: LocationConstraint) -> Self {
        self.inner.location = Some(location);
        self
    }

    #[must_use]
    pub fn build(self) -> PermissionRequest {
        self.inner
    }
}
