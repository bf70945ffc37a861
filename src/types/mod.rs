//! Public value types exposed by the `permit-core` crate.

pub mod constraint;
pub mod domain;
pub mod subject;

pub use constraint::{
    CommunityConstraint, Constraint, GroupConstraint, IdConstraint, LocationConstraint,
    PropertyConstraint, PropertyValueRemoval,
};
pub use domain::{ActionType, PermissionDomain};
pub use subject::{GroupMembership, Subject};
