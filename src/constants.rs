//! Grammar characters and storage bounds shared across the crate.
//!
//! Grant strings persist in a fixed-width text column, so every delimiter
//! here is reserved: values that could contain one are rejected at
//! construction time rather than escaped.

/// Separates the domain, action list, and constraint blob of a grant string.
pub const PART_DELIMITER: char = ':';
/// Separates constraint tokens inside a grant string, and `subject=grant`
/// pairs inside an ACL string.
pub const CONSTRAINT_DELIMITER: char = '&';
/// Separates members of an action list, an id list, a property value list,
/// and an embedded role list.
pub const LIST_DELIMITER: char = ',';
/// Binds a constraint key (or an ACL subject) to its value.
pub const KEY_VALUE_DELIMITER: char = '=';
/// Joins the `property_` marker to the property name in a constraint token.
pub const PROPERTY_PREFIX: &str = "property_";
/// Path separator inside a location constraint.
pub const LOCATION_SEPARATOR: char = '/';
/// Wildcard segment in locations and wildcard value in property constraints.
pub const WILDCARD: &str = "*";
/// Property value that resolves to the acting subject's unique name at
/// evaluation time.
pub const SELF_VARIABLE: &str = "${self}";

/// Opens an embedded role-restriction suffix on an ACL subject name.
pub const ROLE_SUFFIX_OPEN: char = '[';
/// Closes an embedded role-restriction suffix on an ACL subject name.
pub const ROLE_SUFFIX_CLOSE: char = ']';

/// Width of the text column that stores a serialized ACL.
pub const MAX_ACL_STRING_LEN: usize = 2500;

/// Upper bound on ids per compacted grant. Sized so `"id="` plus 124
/// nineteen-digit ids with separators, prefixed by the longest domain/action
/// pair, stays under [`MAX_ACL_STRING_LEN`].
pub const MAX_IDS_PER_COMPACTED_GRANT: usize = 124;
