//! Textual grant grammar and permission-set compaction.
//!
//! The grammar is a persisted storage format and must stay bit-exact:
//! `DOMAIN:ACTION1,ACTION2,...:constraint1&constraint2&...`, the constraint
//! part optional. Serialization always emits the second `:`, so a grant with
//! no constraints ends in `:` (e.g. `Record:Write:`).

use std::collections::BTreeMap;

use crate::constants::{
    CONSTRAINT_DELIMITER, LIST_DELIMITER, MAX_IDS_PER_COMPACTED_GRANT, PART_DELIMITER,
};
use crate::error::{PermitError, Result};
use crate::grant::Permission;
use crate::types::{ActionType, Constraint, IdConstraint, PermissionDomain};

/// Parse a grant string. Unknown domain, action, or constraint tokens are
/// fatal: silently defaulting would grant or deny the wrong permissions.
pub fn resolve(text: &str) -> Result<Permission> {
    let mut parts = text.splitn(3, PART_DELIMITER);
    let domain_part = parts.next().unwrap_or_default();
    let Some(actions_part) = parts.next() else {
        return Err(PermitError::MalformedGrant {
            grant: text.to_string(),
            reason: "missing action list",
        });
    };
    let constraints_part = parts.next().unwrap_or_default();

    let domain: PermissionDomain = domain_part.parse()?;

    let mut builder = Permission::builder(domain);
    let mut any_action = false;
    for token in actions_part.split(LIST_DELIMITER) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        builder = builder.action(token.parse::<ActionType>()?);
        any_action = true;
    }
    if !any_action {
        return Err(PermitError::MalformedGrant {
            grant: text.to_string(),
            reason: "empty action list",
        });
    }

    for token in constraints_part.split(CONSTRAINT_DELIMITER) {
        if token.is_empty() {
            continue;
        }
        builder = match Constraint::parse(token)? {
            Constraint::Id(id) => builder.id_constraint(id),
            Constraint::Property(property) => builder.property(property),
            Constraint::Group(group) => builder.group(group),
            Constraint::Community(community) => builder.community(community),
            Constraint::Location(location) => builder.location(location),
        };
    }

    Ok(builder.build())
}

/// Serialize a grant back into the grammar. Constraints emit in a stable
/// order: id, properties (map order), group, community, locations. Parsing
/// the output reproduces the grant exactly.
#[must_use]
pub fn serialize(permission: &Permission) -> String {
    let actions: Vec<&str> = permission.actions.iter().copied().map(ActionType::token).collect();

    let mut constraints: Vec<String> = Vec::new();
    if let Some(id) = &permission.id_constraint {
        constraints.push(Constraint::Id(id.clone()).to_string());
    }
    for property in permission.property_constraints.values() {
        constraints.push(Constraint::Property(property.clone()).to_string());
    }
    if let Some(group) = &permission.group_constraint {
        constraints.push(Constraint::Group(group.clone()).to_string());
    }
    if let Some(community) = &permission.community_constraint {
        constraints.push(Constraint::Community(*community).to_string());
    }
    for location in &permission.location_constraints {
        constraints.push(Constraint::Location(location.clone()).to_string());
    }

    format!(
        "{}{PART_DELIMITER}{}{PART_DELIMITER}{}",
        permission.domain,
        actions.join(","),
        constraints.join("&")
    )
}

/// Merge single-id grants into batched grants so large sharing sets fit the
/// fixed-width storage column.
///
/// A grant qualifies for extraction when it is enabled, grants exactly one of
/// `Read` or `Write`, and its only constraint is a single-id `IdConstraint`.
/// Extracted ids are partitioned, in encounter order, into batches of at most
/// [`MAX_IDS_PER_COMPACTED_GRANT`]; each batch re-emits as one grant whose id
/// set iterates in ascending order. Everything else passes through in its
/// original position, with merged grants appended after.
#[must_use]
pub fn compact(grants: Vec<Permission>) -> Vec<Permission> {
    let mut kept: Vec<Permission> = Vec::with_capacity(grants.len());
    let mut extracted: BTreeMap<(PermissionDomain, ActionType), Vec<i64>> = BTreeMap::new();

    for grant in grants {
        match single_id_grant(&grant) {
            Some((domain, action, id)) => extracted.entry((domain, action)).or_default().push(id),
            None => kept.push(grant),
        }
    }

    for ((domain, action), ids) in extracted {
        let batches = ids.len().div_ceil(MAX_IDS_PER_COMPACTED_GRANT);
        tracing::debug!(
            domain = %domain,
            action = %action,
            ids = ids.len(),
            batches,
            "compacting single-id grants"
        );
        for chunk in ids.chunks(MAX_IDS_PER_COMPACTED_GRANT) {
            // Chunks are never empty, so construction cannot fail.
            if let Ok(constraint) = IdConstraint::new(chunk.iter().copied()) {
                kept.push(
                    Permission::builder(domain)
                        .action(action)
                        .id_constraint(constraint)
                        .build(),
                );
            }
        }
    }

    kept
}

fn single_id_grant(grant: &Permission) -> Option<(PermissionDomain, ActionType, i64)> {
    if !grant.enabled || grant.actions.len() != 1 {
        return None;
    }
    let action = *grant.actions.iter().next()?;
    if action != ActionType::Read && action != ActionType::Write {
        return None;
    }
    let ids = grant.id_constraint.as_ref()?;
    if ids.len() != 1
        || !grant.property_constraints.is_empty()
        || grant.group_constraint.is_some()
        || grant.community_constraint.is_some()
        || !grant.location_constraints.is_empty()
    {
        return None;
    }
    Some((grant.domain, action, *ids.ids().iter().next()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_ACL_STRING_LEN;
    use crate::types::{
        CommunityConstraint, GroupConstraint, LocationConstraint, PropertyConstraint,
    };

    fn rich_grant() -> Permission {
        Permission::builder(PermissionDomain::Record)
            .actions([ActionType::Read, ActionType::Write, ActionType::Share])
            .id_constraint(IdConstraint::new([9, 2, 5]).expect("ids"))
            .property(PropertyConstraint::new("owner", "${self}").expect("constraint"))
            .property(PropertyConstraint::new("status", "draft,review").expect("constraint"))
            .group(GroupConstraint::new("teamX"))
            .community(CommunityConstraint::new(12))
            .location(LocationConstraint::new("lab/*/shared"))
            .build()
    }

    #[test]
    fn serialize_emits_stable_constraint_order() {
        assert_eq!(
            serialize(&rich_grant()),
            "Record:Read,Share,Write:id=2,5,9&property_owner=${self}&property_status=draft,review&group=teamX&community=12&location=lab/*/shared"
        );
    }

    #[test]
    fn grant_without_constraints_keeps_trailing_delimiter() {
        let grant = Permission::builder(PermissionDomain::Record)
            .action(ActionType::Write)
            .build();
        assert_eq!(serialize(&grant), "Record:Write:");
    }

    #[test]
    fn resolve_round_trips_serialize() {
        for grant in [
            rich_grant(),
            Permission::builder(PermissionDomain::All)
                .action(ActionType::Delete)
                .build(),
            Permission::builder(PermissionDomain::Form)
                .actions([ActionType::Create, ActionType::Publish])
                .id_constraint(IdConstraint::new([77]).expect("ids"))
                .build(),
        ] {
            let text = serialize(&grant);
            let resolved = resolve(&text).expect("round trip");
            assert_eq!(resolved, grant, "round trip failed for {text}");
        }
    }

    #[test]
    fn resolve_accepts_missing_constraint_part() {
        let grant = resolve("Record:Read").expect("two-part grant");
        assert!(grant.matches_action(ActionType::Read));
        assert!(grant.id_constraint.is_none());
    }

    #[test]
    fn resolve_rejects_malformed_input() {
        assert!(matches!(
            resolve("Record"),
            Err(PermitError::MalformedGrant { .. })
        ));
        assert!(matches!(
            resolve("Record::"),
            Err(PermitError::MalformedGrant { .. })
        ));
        assert!(matches!(
            resolve("Bogus:Read:"),
            Err(PermitError::UnknownDomain { .. })
        ));
        assert!(matches!(
            resolve("Record:Peek:"),
            Err(PermitError::UnknownAction { .. })
        ));
        assert!(matches!(
            resolve("Record:Read:tenant=acme"),
            Err(PermitError::UnknownConstraint { .. })
        ));
    }

    #[test]
    fn resolve_tolerates_trailing_action_separator() {
        let grant = resolve("Record:Read,:").expect("trailing separator");
        assert_eq!(grant.actions.len(), 1);
    }

    fn single_read_grant(id: i64) -> Permission {
        Permission::builder(PermissionDomain::Record)
            .action(ActionType::Read)
            .id_constraint(IdConstraint::new([id]).expect("id"))
            .build()
    }

    #[test]
    fn compaction_batches_by_124() {
        let grants: Vec<Permission> = (0..200).map(single_read_grant).collect();
        let compacted = compact(grants);
        assert_eq!(compacted.len(), 2);

        let mut all_ids: Vec<i64> = Vec::new();
        for grant in &compacted {
            let ids = grant.id_constraint.as_ref().expect("merged ids");
            assert!(ids.len() <= MAX_IDS_PER_COMPACTED_GRANT);
            all_ids.extend(ids.ids().iter().copied());
            assert!(serialize(grant).len() <= MAX_ACL_STRING_LEN);
        }
        all_ids.sort_unstable();
        assert_eq!(all_ids, (0..200).collect::<Vec<i64>>());
    }

    #[test]
    fn compaction_batch_of_max_width_ids_fits_storage() {
        // Worst case: 124 nineteen-digit ids in one batch.
        let base = 9_000_000_000_000_000_000_i64;
        let grants: Vec<Permission> = (0..124).map(|n| single_read_grant(base + n)).collect();
        let compacted = compact(grants);
        assert_eq!(compacted.len(), 1);
        assert!(serialize(&compacted[0]).len() <= MAX_ACL_STRING_LEN);
    }

    #[test]
    fn compaction_separates_read_and_write() {
        let mut grants: Vec<Permission> = (0..3).map(single_read_grant).collect();
        grants.extend((10..12).map(|id| {
            Permission::builder(PermissionDomain::Record)
                .action(ActionType::Write)
                .id_constraint(IdConstraint::new([id]).expect("id"))
                .build()
        }));
        let compacted = compact(grants);
        assert_eq!(compacted.len(), 2);
        assert!(compacted[0].matches_action(ActionType::Read));
        assert!(!compacted[0].matches_action(ActionType::Write));
        assert!(compacted[1].matches_action(ActionType::Write));
    }

    #[test]
    fn compaction_passes_through_constrained_and_disabled_grants() {
        let passthrough = Permission::builder(PermissionDomain::Record)
            .action(ActionType::Read)
            .id_constraint(IdConstraint::new([1]).expect("id"))
            .group(GroupConstraint::new("teamX"))
            .build();
        let disabled = {
            let mut grant = single_read_grant(2);
            grant.enabled = false;
            grant
        };
        let multi_action = Permission::builder(PermissionDomain::Record)
            .actions([ActionType::Read, ActionType::Write])
            .id_constraint(IdConstraint::new([3]).expect("id"))
            .build();

        let compacted = compact(vec![
            passthrough.clone(),
            disabled.clone(),
            multi_action.clone(),
            single_read_grant(4),
        ]);
        assert_eq!(compacted.len(), 4);
        assert_eq!(compacted[0], passthrough);
        assert_eq!(compacted[1], disabled);
        assert_eq!(compacted[2], multi_action);
        assert_eq!(compacted[3], single_read_grant(4));
    }

    #[test]
    fn compaction_uses_random_encounter_order_ids() {
        let mut ids: Vec<i64> = (0..150).collect();
        // Shuffle to make encounter order differ from ascending order.
        for index in (1..ids.len()).rev() {
            ids.swap(index, fastrand::usize(..=index));
        }
        let grants: Vec<Permission> = ids.iter().copied().map(single_read_grant).collect();
        let compacted = compact(grants);
        assert_eq!(compacted.len(), 2);

        // Within each batch the ids are ascending regardless of encounter order.
        for grant in &compacted {
            let batch: Vec<i64> = grant
                .id_constraint
                .as_ref()
                .expect("ids")
                .ids()
                .iter()
                .copied()
                .collect();
            assert!(batch.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}
