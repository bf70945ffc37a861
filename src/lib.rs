#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions, allowed project-wide:
//
// Documentation lints: self-documenting predicates don't need exhaustive
// docs; the public matching entry points still carry proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Builders take owned values intentionally, and don't need must_use on
// every chained method.
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
//
// Many index-like types here have a natural len() with no is_empty() use.
#![allow(clippy::len_without_is_empty)]

//! Constraint-based permission resolution: grants, the textual grant
//! grammar, and per-object sharing ACLs.
//!
//! A [`Permission`] is a domain plus an action set plus optional
//! AND-combined constraints. Callers adapt a securable object into an
//! [`EntityPermission`] request and either ask a grant
//! [`Permission::implies`] directly, or ask a [`RecordSharingAcl`]
//! [`RecordSharingAcl::is_permitted`], which resolves its stored grant
//! strings through the [`resolver`] grammar lazily.

/// The permit-core crate version (matches `Cargo.toml`).
pub const PERMIT_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod acl;
pub mod constants;
pub mod error;
pub mod grant;
pub mod request;
pub mod resolver;
pub mod types;

pub use acl::{AclElement, RecordSharingAcl, role_restricted_subject};
pub use constants::{MAX_ACL_STRING_LEN, MAX_IDS_PER_COMPACTED_GRANT, SELF_VARIABLE, WILDCARD};
pub use error::{PermitError, Result};
pub use grant::{Permission, PermissionBuilder};
pub use request::{EntityPermission, PermissionRequest, PermissionRequestBuilder};
pub use resolver::{compact, resolve, serialize};
pub use types::{
    ActionType, CommunityConstraint, Constraint, GroupConstraint, GroupMembership, IdConstraint,
    LocationConstraint, PermissionDomain, PropertyConstraint, PropertyValueRemoval, Subject,
};
