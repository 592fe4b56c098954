//! User model and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Operator role. Ordering matters: later variants hold every capability
/// of earlier ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "staff" => Some(Role::Staff),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    /// Does this role cover the capabilities of `required`?
    pub fn allows(&self, required: Role) -> bool {
        *self >= required
    }
}

/// Public user shape: the password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_ordered() {
        assert!(Role::Superadmin.allows(Role::Admin));
        assert!(Role::Superadmin.allows(Role::Staff));
        assert!(Role::Admin.allows(Role::Staff));
        assert!(!Role::Staff.allows(Role::Admin));
        assert!(!Role::Admin.allows(Role::Superadmin));
        assert!(Role::Staff.allows(Role::Staff));
    }

    #[test]
    fn role_round_trips() {
        for role in [Role::Staff, Role::Admin, Role::Superadmin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("manager"), None);
    }
}
