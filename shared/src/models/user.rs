//! User, role and access policy models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff account. The password hash never leaves the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The three fixed roles of the pharmacy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Pharmacy assistant: records movements and reads reports
    Operator,
    /// Regent pharmacist: additionally manages the medicine catalogue
    Supervisor,
    Administrator,
}

/// Pages and actions gated by role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    ManageMedicines,
    ManageMovements,
    ViewReports,
    ManageWarehouses,
    ManageUsers,
    ViewAuditLog,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ViewDashboard,
        Capability::ManageMedicines,
        Capability::ManageMovements,
        Capability::ViewReports,
        Capability::ManageWarehouses,
        Capability::ManageUsers,
        Capability::ViewAuditLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewDashboard => "view_dashboard",
            Capability::ManageMedicines => "manage_medicines",
            Capability::ManageMovements => "manage_movements",
            Capability::ViewReports => "view_reports",
            Capability::ManageWarehouses => "manage_warehouses",
            Capability::ManageUsers => "manage_users",
            Capability::ViewAuditLog => "view_audit_log",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability table. Roles are not nested: operator and supervisor share
/// movement and report access but differ on medicine management, so each
/// row is spelled out instead of derived from a hierarchy.
const ACCESS_TABLE: &[(Role, &[Capability])] = &[
    (
        Role::Operator,
        &[
            Capability::ViewDashboard,
            Capability::ManageMovements,
            Capability::ViewReports,
        ],
    ),
    (
        Role::Supervisor,
        &[
            Capability::ViewDashboard,
            Capability::ManageMedicines,
            Capability::ManageMovements,
            Capability::ViewReports,
        ],
    ),
    (Role::Administrator, &Capability::ALL),
];

/// Whether `role` may use `capability`
pub fn can_access(role: Role, capability: Capability) -> bool {
    role.capabilities().contains(&capability)
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Operator, Role::Supervisor, Role::Administrator];

    /// Capabilities granted to this role
    pub fn capabilities(&self) -> &'static [Capability] {
        ACCESS_TABLE
            .iter()
            .find(|(role, _)| role == self)
            .map(|(_, caps)| *caps)
            .unwrap_or(&[])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Supervisor => "supervisor",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator" => Ok(Role::Operator),
            "supervisor" => Ok(Role::Supervisor),
            "administrator" => Ok(Role::Administrator),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// A stored string that does not name any known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_a_table_row() {
        for role in Role::ALL {
            assert!(!role.capabilities().is_empty(), "{role} has no capabilities");
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("regente".parse::<Role>().is_err());
    }

    #[test]
    fn test_supervisor_manages_medicines_but_not_users() {
        assert!(can_access(Role::Supervisor, Capability::ManageMedicines));
        assert!(!can_access(Role::Supervisor, Capability::ManageUsers));
        assert!(!can_access(Role::Operator, Capability::ManageMedicines));
    }
}
