//! Constraint primitives narrowing where a grant applies.
//!
//! Each primitive is a side-effect-free predicate. A grant AND-combines every
//! constraint it declares; a kind it does not declare means "don't care".
//! `Constraint` is the tagged union the resolver parses grant tokens into, so
//! constraint kind is decided once at parse time rather than re-derived from
//! string prefixes at each call site.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    KEY_VALUE_DELIMITER, LIST_DELIMITER, LOCATION_SEPARATOR, PART_DELIMITER, PROPERTY_PREFIX,
    SELF_VARIABLE, WILDCARD,
};
use crate::error::{PermitError, Result};

/// Ordered set of numeric ids; satisfied by membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdConstraint {
    ids: BTreeSet<i64>,
}

impl IdConstraint {
    /// Build from any collection of ids. An empty collection is a fatal
    /// construction error, not an always-false constraint.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let ids: BTreeSet<i64> = ids.into_iter().collect();
        if ids.is_empty() {
            return Err(PermitError::EmptyIdConstraint);
        }
        Ok(Self { ids })
    }

    #[must_use]
    pub fn satisfies(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> &BTreeSet<i64> {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Outcome of pruning one value from a multi-valued property constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValueRemoval {
    /// The removed value was the whole constraint; drop the constraint.
    Emptied,
    /// The constraint still carries at least one value.
    Retained,
}

/// Named property test: a literal value, a `,`-separated list of literals,
/// the wildcard `*`, or the `${self}` variable resolved against the acting
/// subject at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyConstraint {
    name: String,
    value: String,
}

impl PropertyConstraint {
    /// Build a property constraint. The value must not contain a reserved
    /// grammar character (`=`, `_`, or `:`).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        if value.contains([KEY_VALUE_DELIMITER, '_', PART_DELIMITER]) {
            return Err(PermitError::ReservedCharacter { name, value });
        }
        Ok(Self { name, value })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value is the acting-subject variable. A value that merely
    /// embeds `${self}` inside a list is not a variable and falls through to
    /// list matching.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.value == SELF_VARIABLE
    }

    /// Whether this constraint accepts `other`. `acting` is the unique name
    /// of the subject the evaluation runs as; it is only consulted when the
    /// value is the `${self}` variable, and an absent acting subject leaves
    /// the variable unresolvable (no match).
    #[must_use]
    pub fn satisfies(&self, other: &PropertyConstraint, acting: Option<&str>) -> bool {
        if self.is_variable() {
            let Some(self_name) = acting else {
                return false;
            };
            return other.name == self.name && other.value == self_name;
        }
        if other.name == self.name && (self.value == WILDCARD || other.value == self.value) {
            return true;
        }
        let tokens: Vec<&str> = self.value.split(LIST_DELIMITER).collect();
        if tokens.len() >= 2 {
            return tokens.iter().any(|token| token.trim() == other.value);
        }
        false
    }

    /// Prune one value from the list, reporting whether the constraint is now
    /// empty and should be removed by the caller.
    pub fn remove_value(&mut self, value: &str) -> PropertyValueRemoval {
        if self.value == value {
            return PropertyValueRemoval::Emptied;
        }
        let retained: Vec<&str> = self
            .value
            .split(LIST_DELIMITER)
            .map(str::trim)
            .filter(|token| !token.is_empty() && *token != value)
            .collect();
        if retained.is_empty() {
            return PropertyValueRemoval::Emptied;
        }
        self.value = retained.join(",");
        PropertyValueRemoval::Retained
    }
}

/// Group name test; satisfied by exact name equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConstraint {
    group_name: String,
}

impl GroupConstraint {
    #[must_use]
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
        }
    }

    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    #[must_use]
    pub fn satisfies(&self, other: &GroupConstraint) -> bool {
        self.group_name == other.group_name
    }
}

/// Community id test; satisfied by exact equality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityConstraint {
    community_id: i64,
}

impl CommunityConstraint {
    #[must_use]
    pub fn new(community_id: i64) -> Self {
        Self { community_id }
    }

    #[must_use]
    pub fn community_id(&self) -> i64 {
        self.community_id
    }

    #[must_use]
    pub fn satisfies(&self, other: &CommunityConstraint) -> bool {
        self.community_id == other.community_id
    }
}

/// Hierarchical `/`-delimited path test with a `*` wildcard segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationConstraint {
    path: String,
}

impl LocationConstraint {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether `candidate` falls inside this path.
    ///
    /// One left-to-right walk yields three behaviors: exact prefix matching,
    /// "any depth below here" from a trailing `*`, and suffix matching of the
    /// segments after a mid-path `*`. A candidate with more segments than a
    /// wildcard-free path is rejected up front; the reverse (shorter
    /// candidate) is left to the walk. That asymmetry is load-bearing for
    /// previously persisted grants; do not symmetrize it.
    #[must_use]
    pub fn satisfies(&self, candidate: &LocationConstraint) -> bool {
        let ours: Vec<&str> = self.path.split(LOCATION_SEPARATOR).collect();
        let theirs: Vec<&str> = candidate.path.split(LOCATION_SEPARATOR).collect();

        if theirs.len() > ours.len() && !ours.contains(&WILDCARD) {
            return false;
        }

        for (index, segment) in ours.iter().enumerate() {
            if *segment == WILDCARD {
                if index == ours.len() - 1 {
                    return true;
                }
                // Mid-path wildcard: our remaining segments must equal the
                // candidate's tail, element for element from the end.
                let tail = &ours[index + 1..];
                if tail.len() > theirs.len() {
                    return false;
                }
                return *tail == theirs[theirs.len() - tail.len()..];
            }
            match theirs.get(index) {
                Some(candidate_segment) if candidate_segment == segment => {}
                _ => return false,
            }
        }
        true
    }
}

/// A parsed constraint token: exactly one of the five primitive kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Constraint {
    Id(IdConstraint),
    Property(PropertyConstraint),
    Group(GroupConstraint),
    Community(CommunityConstraint),
    Location(LocationConstraint),
}

impl Constraint {
    /// Parse one `&`-delimited grant token, e.g. `id=3,4`, `group=lab`,
    /// `community=9`, `location=a/b/*`, `property_owner=${self}`.
    pub fn parse(token: &str) -> Result<Constraint> {
        let Some((key, value)) = token.split_once(KEY_VALUE_DELIMITER) else {
            return Err(PermitError::UnknownConstraint {
                token: token.to_string(),
            });
        };
        match key {
            "id" => {
                let ids = value
                    .split(LIST_DELIMITER)
                    .map(|id| {
                        id.trim()
                            .parse::<i64>()
                            .map_err(|_| PermitError::InvalidNumber {
                                token: id.to_string(),
                            })
                    })
                    .collect::<Result<Vec<i64>>>()?;
                Ok(Constraint::Id(IdConstraint::new(ids)?))
            }
            "group" => Ok(Constraint::Group(GroupConstraint::new(value))),
            "community" => {
                let id = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| PermitError::InvalidNumber {
                        token: value.to_string(),
                    })?;
                Ok(Constraint::Community(CommunityConstraint::new(id)))
            }
            "location" => Ok(Constraint::Location(LocationConstraint::new(value))),
            key if key.starts_with(PROPERTY_PREFIX) => {
                let name = &key[PROPERTY_PREFIX.len()..];
                Ok(Constraint::Property(PropertyConstraint::new(name, value)?))
            }
            _ => Err(PermitError::UnknownConstraint {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Id(id) => {
                write!(f, "id=")?;
                for (index, value) in id.ids().iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Constraint::Property(property) => {
                write!(
                    f,
                    "{PROPERTY_PREFIX}{}={}",
                    property.name(),
                    property.value()
                )
            }
            Constraint::Group(group) => write!(f, "group={}", group.group_name()),
            Constraint::Community(community) => {
                write!(f, "community={}", community.community_id())
            }
            Constraint::Location(location) => write!(f, "location={}", location.path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_membership() {
        let constraint = IdConstraint::new([5, 3, 9]).expect("ids");
        assert!(constraint.satisfies(3));
        assert!(!constraint.satisfies(4));
        let ascending: Vec<i64> = constraint.ids().iter().copied().collect();
        assert_eq!(ascending, vec![3, 5, 9]);
    }

    #[test]
    fn empty_id_set_is_a_construction_error() {
        assert!(matches!(
            IdConstraint::new([]),
            Err(PermitError::EmptyIdConstraint)
        ));
    }

    #[test]
    fn property_wildcard_matches_anything() {
        let owner = PropertyConstraint::new("owner", "*").expect("constraint");
        let anyone = PropertyConstraint::new("owner", "anyone").expect("constraint");
        assert!(owner.satisfies(&anyone, None));
    }

    #[test]
    fn property_exact_match_requires_same_name() {
        let ours = PropertyConstraint::new("owner", "alice").expect("constraint");
        let wrong_name = PropertyConstraint::new("creator", "alice").expect("constraint");
        assert!(!ours.satisfies(&wrong_name, None));
    }

    #[test]
    fn property_list_matches_any_trimmed_token() {
        let list = PropertyConstraint::new("status", "draft, review,final").expect("constraint");
        let review = PropertyConstraint::new("status", "review").expect("constraint");
        let closed = PropertyConstraint::new("status", "closed").expect("constraint");
        assert!(list.satisfies(&review, None));
        assert!(!list.satisfies(&closed, None));
    }

    #[test]
    fn property_self_variable_resolves_to_acting_subject() {
        let owner = PropertyConstraint::new("owner", SELF_VARIABLE).expect("constraint");
        let alice = PropertyConstraint::new("owner", "alice").expect("constraint");
        assert!(owner.satisfies(&alice, Some("alice")));
        assert!(!owner.satisfies(&alice, Some("bob")));
        assert!(!owner.satisfies(&alice, None));
    }

    #[test]
    fn property_self_inside_list_is_not_a_variable() {
        // Combined variable-and-list values are undefined upstream; the
        // value fails the whole-value variable check and is treated as a
        // plain list of literals.
        let mixed = PropertyConstraint::new("owner", "${self},admin").expect("constraint");
        assert!(!mixed.is_variable());
        let admin = PropertyConstraint::new("owner", "admin").expect("constraint");
        let alice = PropertyConstraint::new("owner", "alice").expect("constraint");
        assert!(mixed.satisfies(&admin, Some("alice")));
        assert!(!mixed.satisfies(&alice, Some("alice")));
    }

    #[test]
    fn property_value_rejects_reserved_characters() {
        for value in ["a=b", "a_b", "a:b"] {
            assert!(matches!(
                PropertyConstraint::new("owner", value),
                Err(PermitError::ReservedCharacter { .. })
            ));
        }
    }

    #[test]
    fn remove_value_prunes_list_then_reports_empty() {
        let mut status =
            PropertyConstraint::new("status", "draft,review,final").expect("constraint");
        assert_eq!(status.remove_value("review"), PropertyValueRemoval::Retained);
        assert_eq!(status.value(), "draft,final");
        assert_eq!(status.remove_value("draft"), PropertyValueRemoval::Retained);
        assert_eq!(status.remove_value("final"), PropertyValueRemoval::Emptied);
    }

    #[test]
    fn location_trailing_wildcard_is_a_prefix_match() {
        let tree = LocationConstraint::new("a/b/*");
        assert!(tree.satisfies(&LocationConstraint::new("a/b/c")));
        assert!(tree.satisfies(&LocationConstraint::new("a/b/c/d/e")));
        assert!(!tree.satisfies(&LocationConstraint::new("a/x/c")));
    }

    #[test]
    fn location_mid_wildcard_switches_to_suffix_match() {
        let tree = LocationConstraint::new("a/*/c");
        assert!(tree.satisfies(&LocationConstraint::new("a/x/y/c")));
        assert!(tree.satisfies(&LocationConstraint::new("a/x/c")));
        assert!(!tree.satisfies(&LocationConstraint::new("a/x/y/d")));
    }

    #[test]
    fn location_without_wildcard_rejects_longer_candidate() {
        let exact = LocationConstraint::new("a/b");
        assert!(!exact.satisfies(&LocationConstraint::new("a/b/c")));
        assert!(exact.satisfies(&LocationConstraint::new("a/b")));
        // Shorter candidates fail in the walk, not the length pre-check.
        assert!(!exact.satisfies(&LocationConstraint::new("a")));
    }

    #[test]
    fn constraint_tokens_parse_and_display() {
        let cases = [
            "id=3,5,9",
            "property_owner=${self}",
            "group=teamX",
            "community=42",
            "location=a/*/c",
        ];
        for token in cases {
            let parsed = Constraint::parse(token).expect("token parses");
            assert_eq!(parsed.to_string(), token);
        }
    }

    #[test]
    fn unknown_constraint_key_is_fatal() {
        assert!(matches!(
            Constraint::parse("tenant=acme"),
            Err(PermitError::UnknownConstraint { .. })
        ));
        assert!(matches!(
            Constraint::parse("nodelimiter"),
            Err(PermitError::UnknownConstraint { .. })
        ));
    }

    #[test]
    fn id_constraint_rejects_non_numeric_token() {
        assert!(matches!(
            Constraint::parse("id=3,x"),
            Err(PermitError::InvalidNumber { .. })
        ));
    }
}
