//! Account roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role tag carried in the user record.
///
/// Any tag outside the known set decodes as [`Role::Unknown`], which never
/// matches a role allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular trainee account.
    User,
    /// Organisation administrator. Subject to the subscription gate.
    Admin,
    /// Platform operator. Exempt from reserved-route checks.
    SuperAdmin,
    /// Unrecognised role tag.
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Every role that can be assigned to an account.
    pub const ASSIGNABLE: [Role; 3] = [Role::User, Role::Admin, Role::SuperAdmin];

    /// Parses a tag naming an assignable role. Unknown tags yield `None`.
    pub fn from_assignable(tag: &str) -> Option<Role> {
        Self::ASSIGNABLE.into_iter().find(|role| role.as_str() == tag)
    }

    /// Returns the wire tag for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "user" => Role::User,
            "admin" => Role::Admin,
            "super-admin" => Role::SuperAdmin,
            _ => Role::Unknown,
        })
    }
}
