use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    WriteReviews,
    PostComments,
    LikeContent,
    EditProfile,
}

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::WriteReviews,
    Permission::PostComments,
    Permission::LikeContent,
    Permission::EditProfile,
];

/// Role claims stored per user. Roles only carry permissions; whether a
/// role grants administration is decided by an [`AdminPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Moderator,
    Member,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin | UserRole::Moderator | UserRole::Member => MEMBER_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
            UserRole::Member => "member",
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "moderator" => Ok(UserRole::Moderator),
            "member" => Ok(UserRole::Member),
            other => bail!("Unknown role {:?}", other),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a set of role claims grants administration rights.
pub trait AdminPolicy: Send + Sync {
    fn is_admin(&self, roles: &[UserRole]) -> bool;
}

/// Grants administration to any user holding one of the configured roles.
#[derive(Debug, Clone)]
pub struct RoleClaimAdminPolicy {
    admin_roles: Vec<UserRole>,
}

impl RoleClaimAdminPolicy {
    pub fn new(admin_roles: Vec<UserRole>) -> Self {
        RoleClaimAdminPolicy { admin_roles }
    }

    pub fn from_role_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let admin_roles = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<UserRole>>>()?;
        Ok(Self::new(admin_roles))
    }
}

impl Default for RoleClaimAdminPolicy {
    fn default() -> Self {
        Self::new(vec![UserRole::Admin])
    }
}

impl AdminPolicy for RoleClaimAdminPolicy {
    fn is_admin(&self, roles: &[UserRole]) -> bool {
        roles.iter().any(|role| self.admin_roles.contains(role))
    }
}
