use crate::error::{AuthorizationError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    CreditManager,
    Operator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::CreditManager, Role::Operator];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::CreditManager => "credit_manager",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "credit_manager" => Ok(Role::CreditManager),
            "operator" => Ok(Role::Operator),
            other => Err(ValidationError::Malformed {
                field: "role",
                reason: format!("unknown role '{other}'"),
            }),
        }
    }
}

/// Roles held by one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn all() -> Self {
        Self(Role::ALL.into_iter().collect())
    }

    pub fn grant(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn revoke(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Admin satisfies every requirement.
    pub fn permits(&self, required: Role) -> bool {
        self.contains(Role::Admin) || self.contains(required)
    }

    pub fn require(&self, required: Role) -> Result<(), AuthorizationError> {
        if self.permits(required) {
            Ok(())
        } else {
            Err(AuthorizationError::MissingRole(required.name()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}
