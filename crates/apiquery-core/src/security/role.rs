//! User roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller role, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    /// Regular user.
    User = 1,
    /// Administrator.
    Admin = 2,
    /// Super administrator; bypasses editable scopes.
    SuperAdmin = 3,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
            UserRole::SuperAdmin => write!(f, "super-admin"),
        }
    }
}

/// Unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}', expected user, admin or super-admin")]
pub struct ParseRoleError(String);

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "super-admin" | "superadmin" | "super_admin" => Ok(UserRole::SuperAdmin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}
