//! Permission domains and action types.
//!
//! Both enums are closed: their `Display` output is the persisted grammar
//! token, so adding a variant is a storage-format change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PermitError;

/// Area of the system a grant applies to. `All` is a wildcard that matches
/// any request domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionDomain {
    Admin,
    All,
    Group,
    Record,
    Form,
    Comms,
    User,
    Community,
    App,
}

impl PermissionDomain {
    /// All domains, in grammar-token order.
    pub const ALL_DOMAINS: [PermissionDomain; 9] = [
        PermissionDomain::Admin,
        PermissionDomain::All,
        PermissionDomain::Group,
        PermissionDomain::Record,
        PermissionDomain::Form,
        PermissionDomain::Comms,
        PermissionDomain::User,
        PermissionDomain::Community,
        PermissionDomain::App,
    ];

    /// The persisted grammar token for this domain.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            PermissionDomain::Admin => "Admin",
            PermissionDomain::All => "All",
            PermissionDomain::Group => "Group",
            PermissionDomain::Record => "Record",
            PermissionDomain::Form => "Form",
            PermissionDomain::Comms => "Comms",
            PermissionDomain::User => "User",
            PermissionDomain::Community => "Community",
            PermissionDomain::App => "App",
        }
    }

    /// Whether a grant in this domain covers a request in `requested`.
    #[must_use]
    pub fn covers(self, requested: PermissionDomain) -> bool {
        self == PermissionDomain::All || self == requested
    }
}

impl fmt::Display for PermissionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for PermissionDomain {
    type Err = PermitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL_DOMAINS
            .into_iter()
            .find(|domain| domain.token() == s)
            .ok_or_else(|| PermitError::UnknownDomain {
                token: s.to_string(),
            })
    }
}

/// Operation a subject may be granted or may request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionType {
    Copy,
    Create,
    CreateFolder,
    Delete,
    Export,
    Read,
    FolderReceive,
    Send,
    Share,
    Write,
    None,
    Rename,
    RequestExternalShare,
    Sign,
    Publish,
}

impl ActionType {
    /// All actions, in grammar-token order.
    pub const ALL_ACTIONS: [ActionType; 15] = [
        ActionType::Copy,
        ActionType::Create,
        ActionType::CreateFolder,
        ActionType::Delete,
        ActionType::Export,
        ActionType::Read,
        ActionType::FolderReceive,
        ActionType::Send,
        ActionType::Share,
        ActionType::Write,
        ActionType::None,
        ActionType::Rename,
        ActionType::RequestExternalShare,
        ActionType::Sign,
        ActionType::Publish,
    ];

    /// The persisted grammar token for this action.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            ActionType::Copy => "Copy",
            ActionType::Create => "Create",
            ActionType::CreateFolder => "CreateFolder",
            ActionType::Delete => "Delete",
            ActionType::Export => "Export",
            ActionType::Read => "Read",
            ActionType::FolderReceive => "FolderReceive",
            ActionType::Send => "Send",
            ActionType::Share => "Share",
            ActionType::Write => "Write",
            ActionType::None => "None",
            ActionType::Rename => "Rename",
            ActionType::RequestExternalShare => "RequestExternalShare",
            ActionType::Sign => "Sign",
            ActionType::Publish => "Publish",
        }
    }

    /// Whether holding this action is sufficient for a request of
    /// `requested`. Holding `Write` satisfies a `Read` request; there are no
    /// other implications.
    #[must_use]
    pub fn satisfies(self, requested: ActionType) -> bool {
        self == requested || (self == ActionType::Write && requested == ActionType::Read)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ActionType {
    type Err = PermitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL_ACTIONS
            .into_iter()
            .find(|action| action.token() == s)
            .ok_or_else(|| PermitError::UnknownAction {
                token: s.to_string(),
            })
    }
}
