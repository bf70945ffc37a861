//! Error types for `permit-core`.
//!
//! Grammar and construction failures are fatal and carry the offending token
//! so callers can log them as data-integrity events; a constraint merely
//! failing to match is never an error.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PermitError>;

/// Errors raised while parsing grant grammar or constructing constraints.
#[derive(Debug, Error)]
pub enum PermitError {
    /// Domain token not in the closed `PermissionDomain` set.
    #[error("unknown permission domain: {token}")]
    UnknownDomain { token: String },

    /// Action token not in the closed `ActionType` set.
    #[error("unknown action type: {token}")]
    UnknownAction { token: String },

    /// Constraint token whose key is none of `id`, `group`, `community`,
    /// `location`, or a `property_` form.
    #[error("unknown constraint token: {token}")]
    UnknownConstraint { token: String },

    /// Grant string missing a required part or delimiter.
    #[error("malformed grant string {grant:?}: {reason}")]
    MalformedGrant {
        grant: String,
        reason: &'static str,
    },

    /// Numeric id field that does not parse as an integer.
    #[error("invalid numeric id: {token}")]
    InvalidNumber { token: String },

    /// Property value containing a reserved grammar character.
    #[error("property {name:?} value {value:?} contains a reserved character")]
    ReservedCharacter { name: String, value: String },

    /// Id constraint constructed from an empty id set.
    #[error("id constraint requires at least one id")]
    EmptyIdConstraint,

    /// ACL string entry that cannot be split into subject and grant.
    #[error("malformed ACL entry: {entry}")]
    MalformedAclEntry { entry: String },
}
